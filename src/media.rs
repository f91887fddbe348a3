use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::model::Attachment;

/// Longest file name kept from an upload, in characters.
const MAX_NAME_LENGTH: usize = 100;

/// Local storage for uploaded files.
///
/// Files are stored under `root/<upload_to>/`, and the path relative to
/// `root` is what gets recorded on the post.
#[derive(Debug, Clone)]
pub struct MediaStore {
	root: PathBuf,
}

impl MediaStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Writes `bytes` under a fresh name and returns the stored reference.
	#[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
	pub async fn save(
		&self,
		attachment: Attachment,
		file_name: &str,
		bytes: &[u8],
	) -> std::io::Result<String> {
		let name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
		let dir = self.root.join(attachment.upload_to());

		tokio::fs::create_dir_all(&dir).await?;
		tokio::fs::write(dir.join(&name), bytes).await?;

		tracing::debug!(%name, "stored upload");

		Ok(format!("{}/{}", attachment.upload_to(), name))
	}
}

/// Keeps the last path component of `name`, replacing anything that is not
/// ASCII alphanumeric, `.`, `-` or `_`.
pub fn sanitize_file_name(name: &str) -> String {
	let name = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

	let sanitized = name
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
				c
			} else {
				'_'
			}
		})
		.take(MAX_NAME_LENGTH)
		.collect::<String>();

	if sanitized.trim_matches('.').is_empty() {
		"file".into()
	} else {
		sanitized
	}
}

/// Whether an upload is an image, going by its content type or, failing
/// that, its file name.
pub fn is_image(content_type: Option<&str>, file_name: &str) -> bool {
	if content_type.is_some_and(|content_type| content_type.starts_with("image/")) {
		return true;
	}

	mime_guess::from_path(file_name)
		.first()
		.is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_sanitize_file_name() {
		assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
		assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
		assert_eq!(sanitize_file_name("C:\\docs\\my file.txt"), "my_file.txt");
		assert_eq!(sanitize_file_name("სურათი.png"), "______.png");
		assert_eq!(sanitize_file_name(""), "file");
		assert_eq!(sanitize_file_name(".."), "file");
		assert_eq!(sanitize_file_name(&"a".repeat(500)).len(), MAX_NAME_LENGTH);
	}

	#[test]
	fn test_is_image() {
		assert!(is_image(Some("image/png"), "x"));
		assert!(is_image(None, "photo.jpg"));
		assert!(is_image(Some("application/octet-stream"), "photo.png"));
		assert!(!is_image(Some("text/plain"), "notes.txt"));
		assert!(!is_image(None, "file"));
	}

	#[tokio::test]
	async fn test_save() {
		let root = std::env::temp_dir().join(format!("media-{}", Uuid::new_v4()));
		let media = MediaStore::new(&root);

		let reference = media
			.save(Attachment::Document, "notes.txt", b"hello")
			.await
			.unwrap();

		assert!(Attachment::Document.is_valid_reference(&reference));
		assert!(reference.ends_with("-notes.txt"));
		assert_eq!(tokio::fs::read(root.join(&reference)).await.unwrap(), b"hello");

		tokio::fs::remove_dir_all(&root).await.unwrap();
	}
}
