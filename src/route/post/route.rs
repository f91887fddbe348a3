use axum::extract::State;
use futures::TryStreamExt;
use macros::route;

use crate::{
	extract::{Json, Path, Query, Upload},
	media::{self, MediaStore},
	model::Attachment,
	openapi::tag,
	store::SharedStore,
};

use super::{model, Error, RouteError};

/// Get all posts
/// Returns a paginated response of posts, ordered by title and then by creation time.
#[route(tag = tag::POST)]
pub async fn list_posts(
	State(store): State<SharedStore>,
	Query(input): Query<model::ListInput>,
) -> Result<Json<Vec<model::BlogPost>>, RouteError> {
	let posts = store
		.list(input.into())
		.try_collect::<Vec<_>>()
		.await?;

	Ok(Json(posts))
}

/// Get single post
/// Returns a single post by its unique id.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(store): State<SharedStore>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::BlogPost>, RouteError> {
	Ok(Json(store.get(path.id).await?))
}

/// Create post
/// Creates a new post. The title and text together must be unique.
#[route(tag = tag::POST, response(status = 409, description = "A post with the same title and text already exists."))]
pub async fn create_post(
	State(store): State<SharedStore>,
	Json(input): Json<model::CreateBlogPost>,
) -> Result<Json<model::BlogPost>, RouteError> {
	let post = store.create(input).await?;

	tracing::info!(id = %post.id, title = %post, "created post");

	Ok(Json(post))
}

/// Update post
/// Updates an existing post by its unique id. Fields that are left out keep their current value.
#[route(tag = tag::POST, response(status = 409, description = "A post with the same title and text already exists."))]
pub async fn update_post(
	State(store): State<SharedStore>,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateBlogPost>,
) -> Result<Json<model::BlogPost>, RouteError> {
	Ok(Json(store.update(path.id, input).await?))
}

/// Delete post
/// Deletes an existing post by its unique id. Attached files are kept.
#[route(tag = tag::POST)]
pub async fn delete_post(
	State(store): State<SharedStore>,
	Path(path): Path<model::IdInput>,
) -> Result<(), RouteError> {
	store.delete(path.id).await?;

	tracing::info!(id = %path.id, "deleted post");

	Ok(())
}

/// Stores an upload and records it on the post.
async fn attach(
	store: SharedStore,
	media: MediaStore,
	path: model::IdInput,
	attachment: Attachment,
	upload: Upload,
) -> Result<Json<model::BlogPost>, RouteError> {
	if attachment == Attachment::Picture
		&& !media::is_image(upload.content_type.as_deref(), &upload.file_name)
	{
		return Err(Error::InvalidAttachment(attachment).into());
	}

	// Avoid leaving files behind for posts that do not exist
	store.get(path.id).await?;

	let reference = media
		.save(attachment, &upload.file_name, &upload.bytes)
		.await?;

	Ok(Json(
		store
			.set_attachment(path.id, attachment, Some(reference))
			.await?,
	))
}

/// Upload document
/// Uploads a file in the `file` multipart field and sets it as the post's document.
#[route(tag = tag::POST)]
pub async fn upload_document(
	State(store): State<SharedStore>,
	State(media): State<MediaStore>,
	Path(path): Path<model::IdInput>,
	upload: Upload,
) -> Result<Json<model::BlogPost>, RouteError> {
	attach(store, media, path, Attachment::Document, upload).await
}

/// Remove document
/// Removes the document from the post. The stored file is kept.
#[route(tag = tag::POST)]
pub async fn clear_document(
	State(store): State<SharedStore>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::BlogPost>, RouteError> {
	Ok(Json(
		store
			.set_attachment(path.id, Attachment::Document, None)
			.await?,
	))
}

/// Upload picture
/// Uploads an image in the `file` multipart field and sets it as the post's picture.
#[route(tag = tag::POST)]
pub async fn upload_picture(
	State(store): State<SharedStore>,
	State(media): State<MediaStore>,
	Path(path): Path<model::IdInput>,
	upload: Upload,
) -> Result<Json<model::BlogPost>, RouteError> {
	attach(store, media, path, Attachment::Picture, upload).await
}

/// Remove picture
/// Removes the picture from the post. The stored file is kept.
#[route(tag = tag::POST)]
pub async fn clear_picture(
	State(store): State<SharedStore>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::BlogPost>, RouteError> {
	Ok(Json(
		store
			.set_attachment(path.id, Attachment::Picture, None)
			.await?,
	))
}
