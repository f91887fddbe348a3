use aide::axum::{
	routing::{get_with, put_with},
	ApiRouter,
};
use axum::{extract::DefaultBodyLimit, http::StatusCode};
use uuid::Uuid;

use crate::{error, model::Attachment, store, AppState};

pub mod model;
pub mod route;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(Uuid),
	#[error("duplicate_post")]
	DuplicatePost,
	#[error("invalid_attachment")]
	InvalidAttachment(Attachment),
}

pub type RouteError = error::RouteError<Error>;

impl From<store::Error> for RouteError {
	fn from(error: store::Error) -> Self {
		match error {
			store::Error::NotFound(id) => Error::UnknownPost(id).into(),
			store::Error::Duplicate => Error::DuplicatePost.into(),
			store::Error::Database(error) => error::AppError::Database(error).into(),
		}
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_posts, list_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
		.api_route(
			"/:id/document",
			put_with(upload_document, upload_document_docs)
				.delete_with(clear_document, clear_document_docs),
		)
		.api_route(
			"/:id/picture",
			put_with(upload_picture, upload_picture_docs)
				.delete_with(clear_picture, clear_picture_docs),
		)
		.layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::DuplicatePost => StatusCode::CONFLICT,
			Self::InvalidAttachment(..) => StatusCode::BAD_REQUEST,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let code = error::Message::new(self.to_string());

		let message = match self {
			Self::UnknownPost(post) => code
				.content("The post you provided does not exist.")
				.detail("post", post.to_string()),
			Self::DuplicatePost => code
				.content("A post with the same title and text already exists.")
				.field("title"),
			Self::InvalidAttachment(attachment) => code
				.content(match attachment {
					Attachment::Picture => "The uploaded file is not an image.",
					Attachment::Document => "The uploaded file is not a valid document.",
				})
				.field(attachment.name()),
		};

		message.into_vec()
	}
}
