//! Static File Serving
//!
//! Serves the photo booth page (camera capture UI) from the configured
//! static directory, with a built-in landing page when it is missing.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Create router for serving static files
pub fn router(static_dir: PathBuf) -> Router {
    if static_dir.is_dir() {
        info!(path = %static_dir.display(), "Found static files directory");
    } else {
        warn!(
            path = %static_dir.display(),
            "Static files directory not found, serving built-in page"
        );
    }

    let serve_dir = ServeDir::new(&static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(serve_index))
        .fallback_service(serve_dir)
        .with_state(static_dir)
}

/// Serve the index page
async fn serve_index(State(static_dir): State<PathBuf>) -> Response {
    let content = tokio::fs::read_to_string(static_dir.join("index.html"))
        .await
        .unwrap_or_else(|_| FALLBACK_HTML.to_string());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        content,
    )
        .into_response()
}

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Employee Photos - API Server</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
               max-width: 760px; margin: 0 auto; padding: 40px 20px; color: #222; }
        code { background: #f0f0f0; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Employee Photos</h1>
    <p>The backend is running. Place the capture page at
       <code>static/index.html</code> to serve it here.</p>
    <h3>API Endpoints</h3>
    <ul>
        <li><code>POST /api/upload-photo</code> - Save one pose for an employee</li>
        <li><code>GET /api/employees</code> - Employees and photo counts</li>
        <li><code>POST /api/authenticate-gdrive</code> - Connect to Google Drive</li>
        <li><code>POST /api/upload-to-gdrive</code> - Upload every employee folder</li>
        <li><code>POST /api/upload-session</code> - Upload one employee's session</li>
        <li><code>GET /api/health</code> - Health check</li>
    </ul>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get_index(static_dir: PathBuf) -> String {
        let response = router(static_dir)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_index_from_static_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), "<h1>booth</h1>").unwrap();
        assert_eq!(get_index(temp_dir.path().to_path_buf()).await, "<h1>booth</h1>");
    }

    #[tokio::test]
    async fn test_fallback_page() {
        let temp_dir = TempDir::new().unwrap();
        let html = get_index(temp_dir.path().join("missing")).await;
        assert!(html.contains("/api/upload-photo"));
    }
}
