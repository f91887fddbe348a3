use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{
	response::{Html, IntoResponse, Response},
	routing::get,
	Extension,
};

use crate::AppState;

/// The API reference page, rendered by the build script.
const SCALAR_HTML: &str = include_str!(concat!(env!("OUT_DIR"), "/scalar.html"));

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new()
		.route("/", get(serve_reference))
		.route("/private/api.json", get(serve_docs))
}

async fn serve_reference() -> Html<&'static str> {
	Html(SCALAR_HTML)
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> Response {
	axum::Json(&*api).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_openapi_document() {
		let app = app();

		let response = app.get("/docs/private/api.json").await;

		assert_eq!(response.status_code(), 200);

		let api = response.json::<Value>();
		let paths = api["paths"].as_object().unwrap();

		assert!(paths["/posts/{id}/picture"]["put"].is_object());
		assert!(paths
			.values()
			.any(|path| path["get"]["summary"] == "Get all posts"));
	}

	#[tokio::test]
	async fn test_reference_page() {
		let app = app();

		let response = app.get("/docs").await;

		assert_eq!(response.status_code(), 200);
		assert!(response.text().contains("api-reference"));
	}
}
