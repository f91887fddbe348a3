use aide::OperationInput;
use axum::{
	body::Bytes,
	extract::{FromRequest, Multipart, Request},
};

use crate::error::AppError;

/// Name of the multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Extracts a single file from a `multipart/form-data` body.
///
/// The file must be sent in the [`FILE_FIELD`] field; other fields are ignored.
/// If it is missing, an [`AppError::MissingFile`] is returned.
///
/// ```rust
/// async fn route(upload: Upload) {
///   println!("{} ({} bytes)", upload.file_name, upload.bytes.len());
/// }
/// ```
#[derive(Debug)]
pub struct Upload {
	/// The file name sent by the client, possibly empty.
	pub file_name: String,
	/// The content type sent by the client, if any.
	pub content_type: Option<String>,
	pub bytes: Bytes,
}

#[axum::async_trait]
impl<S> FromRequest<S> for Upload
where
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let mut multipart = Multipart::from_request(req, state).await?;

		while let Some(field) = multipart.next_field().await? {
			if field.name() != Some(FILE_FIELD) {
				continue;
			}

			let file_name = field.file_name().unwrap_or_default().to_owned();
			let content_type = field.content_type().map(str::to_owned);
			let bytes = field.bytes().await?;

			return Ok(Self {
				file_name,
				content_type,
				bytes,
			});
		}

		Err(AppError::MissingFile(FILE_FIELD))
	}
}

impl OperationInput for Upload {}
