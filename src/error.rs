use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::{
		multipart::{MultipartError, MultipartRejection},
		rejection::{PathRejection, QueryRejection},
	},
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message presented to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A machine-readable error code.
	pub code: Cow<'a, str>,
	/// A human-readable description of the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<Cow<'a, str>>,
	/// The input field the error relates to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Additional structured information about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl<'a> Message<'a> {
	pub fn new(code: impl Into<Cow<'a, str>>) -> Self {
		Self {
			code: code.into(),
			content: None,
			field: None,
			details: None,
		}
	}

	pub fn content(mut self, content: impl Into<Cow<'a, str>>) -> Self {
		self.content = Some(content.into());
		self
	}

	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message<'static>>,
}

/// Describes how an error is presented to the client.
pub trait ErrorShape: Sized {
	fn status(&self) -> StatusCode;

	fn into_errors(self) -> Vec<Message<'static>>;

	fn into_error_response(self) -> Response<Body> {
		let status = self.status();

		response(status, self.into_errors())
	}
}

fn response(status: StatusCode, errors: Vec<Message<'static>>) -> Response<Body> {
	(
		status,
		Json(ErrorResponse {
			success: false,
			errors,
		}),
	)
		.into_response()
}

/// Errors shared by every route, mostly rejected input.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("invalid body: {0}")]
	Body(String),
	#[error("body does not match the schema: {0:?}")]
	Schema(Vec<SchemaViolation>),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("multipart error: {0}")]
	MultipartRejection(#[from] MultipartRejection),
	#[error("multipart error: {0}")]
	Multipart(#[from] MultipartError),
	#[error("no file in the `{0}` field")]
	MissingFile(&'static str),
	#[error("rate limit error: {0:?}")]
	RateLimit(GovernorError),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// A JSON schema keyword that a request body failed.
#[derive(Debug)]
pub struct SchemaViolation {
	/// Path to the offending value, without the leading `/`. Empty for the body itself.
	pub field: String,
	pub keyword: String,
	pub description: String,
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		match rejection {
			JsonSchemaRejection::Json(rejection) => Self::Body(rejection.body_text()),
			JsonSchemaRejection::Serde(error) => Self::Body(error.to_string()),
			JsonSchemaRejection::Schema(units) => Self::Schema(
				units
					.into_iter()
					.map(|unit| {
						let keyword = unit.keyword_location().to_string();

						SchemaViolation {
							field: unit
								.instance_location()
								.to_string()
								.trim_start_matches('/')
								.to_owned(),
							keyword: keyword.rsplit('/').next().unwrap_or_default().to_owned(),
							description: unit.error_description().to_string(),
						}
					})
					.collect(),
			),
		}
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

// Not an `ErrorShape`, since `RouteError<T>` converts from both `T` and `AppError`.
impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..)
			| Self::Body(..)
			| Self::Schema(..)
			| Self::Query(..)
			| Self::Path(..)
			| Self::MissingFile(..) => StatusCode::BAD_REQUEST,
			Self::MultipartRejection(rejection) => rejection.status(),
			Self::Multipart(error) => error.status(),
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(GovernorError::Other { code, .. }) => *code,
			Self::RateLimit(..) | Self::Database(..) | Self::Io(..) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	pub fn into_errors(self) -> Vec<Message<'static>> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					let field = field.to_string();

					errors.iter().map(move |error| {
						let mut message = Message::new(error.code.clone()).field(field.clone());

						if let Some(content) = &error.message {
							message = message.content(content.clone());
						}

						error.params.iter().fold(message, |message, (key, value)| {
							message.detail(key.to_string(), value.clone())
						})
					})
				})
				.collect(),
			Self::Body(content) => Message::new("invalid_body").content(content).into_vec(),
			Self::Schema(violations) => violations
				.into_iter()
				.map(|violation| {
					let message = Message::new(violation.keyword).content(violation.description);

					if violation.field.is_empty() {
						message
					} else {
						message.field(violation.field)
					}
				})
				.collect(),
			Self::Query(rejection) => Message::new("invalid_query")
				.content(rejection.body_text())
				.into_vec(),
			Self::Path(rejection) => Message::new("invalid_path")
				.content(rejection.body_text())
				.into_vec(),
			Self::MultipartRejection(rejection) => Message::new("invalid_multipart")
				.content(rejection.body_text())
				.into_vec(),
			Self::Multipart(error) => Message::new("invalid_multipart")
				.content(error.body_text())
				.into_vec(),
			Self::MissingFile(field) => Message::new("missing_file").field(field).into_vec(),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => {
				Message::new("too_many_requests")
					.detail("wait_time", wait_time)
					.into_vec()
			}
			error => {
				tracing::error!(%error, "internal error");

				Message::new("internal_server_error").into_vec()
			}
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		response(self.status(), self.into_errors())
	}
}

/// The error type returned from routes.
///
/// `T` holds the errors specific to a group of routes, everything
/// else is an [`AppError`].
#[derive(Debug)]
pub enum RouteError<T> {
	Route(T),
	App(AppError),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<std::io::Error> for RouteError<T> {
	fn from(error: std::io::Error) -> Self {
		Self::App(error.into())
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => error.into_error_response(),
			Self::App(error) => error.into_response(),
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = ErrorResponse;
}
