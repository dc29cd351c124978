use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/ui/"]
struct UiAssets;

/// Serves the embedded web page; `/` maps to `index.html`.
pub(super) async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    match UiAssets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], file.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_embedded() {
        let index = UiAssets::get("index.html").unwrap();
        let html = String::from_utf8_lossy(&index.data);
        assert!(html.contains("/api/collage/stream"));
    }

    #[tokio::test]
    async fn test_unknown_asset_is_404() {
        let response = static_handler(Uri::from_static("/nope.js")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
