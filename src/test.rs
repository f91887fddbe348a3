use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};

pub use axum_test::TestServer;
pub use serde_json::{json, Value};

use crate::{media::MediaStore, route, store::MemoryStore, State};

const BOUNDARY: &str = "blog-post-api-boundary";

/// Creates a server backed by an empty in-memory store and a fresh media directory.
pub fn app() -> TestServer {
	let state = State {
		store: Arc::new(MemoryStore::new()),
		media: MediaStore::new(
			std::env::temp_dir().join(format!("blog-post-api-{}", uuid::Uuid::new_v4())),
		),
	};

	TestServer::new(route::router(state)).unwrap()
}

pub fn timestamp(value: &Value) -> DateTime<Utc> {
	value.as_str().unwrap().parse().unwrap()
}

/// Builds a multipart body with a single file in the `file` field.
pub fn multipart(file_name: &str, content_type: &str, body: &[u8]) -> (String, Bytes) {
	multipart_field("file", file_name, content_type, body)
}

pub fn multipart_field(
	field: &str,
	file_name: &str,
	content_type: &str,
	body: &[u8],
) -> (String, Bytes) {
	let mut bytes = format!(
		"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
	)
	.into_bytes();

	bytes.extend_from_slice(body);
	bytes.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

	(
		format!("multipart/form-data; boundary={BOUNDARY}"),
		Bytes::from(bytes),
	)
}
