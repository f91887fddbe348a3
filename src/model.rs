use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// The current time, truncated to the microsecond precision of the database.
pub fn now() -> DateTime<Utc> {
	Utc::now().trunc_subsecs(6)
}

/// Reusable field set for records that remember when they were created.
///
/// Embedded by value and flattened, so `created_at` appears as a regular
/// column and JSON field of the owning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
pub struct CreatedAtFields {
	/// The creation time of the record. Never changes after insertion.
	#[schemars(title = "შექმნის თარიღი")]
	pub created_at: DateTime<Utc>,
}

#[inline]
fn default_true() -> bool {
	true
}

/// A file attached to a blog post, stored outside the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
	Document,
	Picture,
}

impl Attachment {
	/// The directory, relative to the media root, that uploads are stored in.
	pub fn upload_to(self) -> &'static str {
		match self {
			Self::Document => "blog_post_documents",
			Self::Picture => "blog_post_picture",
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Document => "document",
			Self::Picture => "picture",
		}
	}

	/// Checks that `reference` points to a file inside this attachment's upload directory.
	pub fn is_valid_reference(self, reference: &str) -> bool {
		reference
			.strip_prefix(self.upload_to())
			.and_then(|rest| rest.strip_prefix('/'))
			.is_some_and(|name| {
				!name.is_empty() && !name.contains('/') && !name.contains('\\') && name != ".."
			})
	}
}

fn validate_reference(attachment: Attachment, reference: &str) -> Result<(), ValidationError> {
	if attachment.is_valid_reference(reference) {
		return Ok(());
	}

	let mut error = ValidationError::new("invalid_reference");
	error.add_param("upload_to".into(), &attachment.upload_to());

	Err(error)
}

fn validate_document(reference: &str) -> Result<(), ValidationError> {
	validate_reference(Attachment::Document, reference)
}

fn validate_picture(reference: &str) -> Result<(), ValidationError> {
	validate_reference(Attachment::Picture, reference)
}

/// A single blog post.
#[model]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct BlogPost {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The title of the post. Together with `text`, unique across all posts.
	#[schemars(title = "სათაური")]
	#[validate(length(min = 1, max = 255))]
	pub title: String,
	/// The body of the post.
	#[schemars(title = "ტექსტი")]
	#[validate(length(min = 1))]
	pub text: String,
	/// Whether the post is active.
	#[schemars(title = "აქტიურია")]
	#[serde(default = "default_true")]
	pub is_active: bool,
	#[serde(flatten)]
	#[sqlx(flatten)]
	pub created: CreatedAtFields,
	/// The last time the post was changed.
	#[schemars(title = "განახლების თარიღი")]
	#[serde(skip_deserializing)]
	pub updated_at: DateTime<Utc>,
	/// A related website.
	#[schemars(title = "ვებ მისამართი")]
	#[validate(url)]
	pub website: Option<String>,
	/// Reference to the attached document, relative to the media root.
	#[schemars(title = "დოკუმენტი")]
	#[validate(custom(function = "validate_document"))]
	pub document: Option<String>,
	/// Reference to the attached picture, relative to the media root.
	#[schemars(title = "სურათი")]
	#[validate(custom(function = "validate_picture"))]
	pub picture: Option<String>,
}

impl BlogPost {
	pub const VERBOSE_NAME: &'static str = "Blog Post";
	pub const VERBOSE_NAME_PLURAL: &'static str = "Blog Posts";

	/// Builds a new post from the create input, stamping both timestamps with `now`.
	pub fn new(input: CreateBlogPost, now: DateTime<Utc>) -> Self {
		Self {
			id: Uuid::new_v4(),
			title: input.title,
			text: input.text,
			is_active: input.is_active,
			created: CreatedAtFields { created_at: now },
			updated_at: now,
			website: input.website,
			document: input.document,
			picture: input.picture,
		}
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created.created_at
	}

	/// Applies the fields present in `input`, leaving the others unchanged.
	///
	/// `updated_at` never moves backwards, even if the clock does.
	pub fn apply(&mut self, input: UpdateBlogPost, now: DateTime<Utc>) {
		if let Some(title) = input.title {
			self.title = title;
		}
		if let Some(text) = input.text {
			self.text = text;
		}
		if let Some(is_active) = input.is_active {
			self.is_active = is_active;
		}
		if input.website.is_some() {
			self.website = input.website;
		}
		if input.document.is_some() {
			self.document = input.document;
		}
		if input.picture.is_some() {
			self.picture = input.picture;
		}

		self.touch(now);
	}

	pub fn set_attachment(
		&mut self,
		attachment: Attachment,
		reference: Option<String>,
		now: DateTime<Utc>,
	) {
		match attachment {
			Attachment::Document => self.document = reference,
			Attachment::Picture => self.picture = reference,
		}

		self.touch(now);
	}

	fn touch(&mut self, now: DateTime<Utc>) {
		self.updated_at = now.max(self.updated_at);
	}
}

impl fmt::Display for BlogPost {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.title)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn input(title: &str, text: &str) -> CreateBlogPost {
		CreateBlogPost {
			title: title.into(),
			text: text.into(),
			is_active: true,
			website: None,
			document: None,
			picture: None,
		}
	}

	#[test]
	fn test_new_post_timestamps_match() {
		let now = now();
		let post = BlogPost::new(input("ა", "ტესტი"), now);

		assert_eq!(post.created_at(), now);
		assert_eq!(post.updated_at, now);
		assert_eq!(post.to_string(), "ა");
	}

	#[test]
	fn test_apply_keeps_created_at() {
		let created = now();
		let mut post = BlogPost::new(input("a", "b"), created);

		post.apply(
			UpdateBlogPost {
				title: Some("c".into()),
				text: None,
				is_active: Some(false),
				website: None,
				document: None,
				picture: None,
			},
			created + chrono::Duration::seconds(5),
		);

		assert_eq!(post.title, "c");
		assert_eq!(post.text, "b");
		assert!(!post.is_active);
		assert_eq!(post.created_at(), created);
		assert_eq!(post.updated_at, created + chrono::Duration::seconds(5));
	}

	#[test]
	fn test_updated_at_never_moves_backwards() {
		let created = now();
		let mut post = BlogPost::new(input("a", "b"), created);

		post.set_attachment(
			Attachment::Picture,
			Some("blog_post_picture/x.png".into()),
			created - chrono::Duration::seconds(5),
		);

		assert_eq!(post.updated_at, created);
		assert!(post.updated_at >= post.created_at());
	}

	#[test]
	fn test_title_length_limit() {
		assert!(input(&"ა".repeat(255), "text").validate().is_ok());
		assert!(input(&"ა".repeat(256), "text").validate().is_err());
		assert!(input("", "text").validate().is_err());
		assert!(input("title", "").validate().is_err());
	}

	#[test]
	fn test_website_must_be_url() {
		let mut post = input("a", "b");
		post.website = Some("not a url".into());

		assert!(post.validate().is_err());

		post.website = Some("https://example.com".into());

		assert!(post.validate().is_ok());
	}

	#[test]
	fn test_attachment_references() {
		assert!(Attachment::Document.is_valid_reference("blog_post_documents/a.pdf"));
		assert!(!Attachment::Document.is_valid_reference("blog_post_picture/a.png"));
		assert!(!Attachment::Document.is_valid_reference("blog_post_documents/"));
		assert!(!Attachment::Document.is_valid_reference("blog_post_documents/../x"));
		assert!(!Attachment::Picture.is_valid_reference("/etc/passwd"));

		let mut post = input("a", "b");
		post.picture = Some("blog_post_documents/a.png".into());

		assert!(post.validate().is_err());
	}
}
