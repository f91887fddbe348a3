//! Storage for blog posts.
//!
//! The [`Store`] trait is the contract every backend satisfies:
//!
//! - `(title, text)` pairs are unique, enforced by an explicit index.
//! - `created_at` is assigned once, by [`Store::create`].
//! - `updated_at` is refreshed by every successful mutation and never
//!   falls behind `created_at`.
//! - [`Store::list`] yields posts in [`default_order`].

mod memory;
mod postgres;

use std::{cmp::Ordering, sync::Arc};

use futures::stream::BoxStream;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::model::{Attachment, BlogPost, CreateBlogPost, UpdateBlogPost};

pub type SharedStore = Arc<dyn Store>;

/// An error returned by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("blog post {0} does not exist")]
	NotFound(Uuid),
	#[error("a blog post with the same title and text already exists")]
	Duplicate,
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

/// Which posts [`Store::list`] returns.
#[derive(Debug, Clone, Default)]
pub struct Filter {
	/// Only posts with this `is_active` value.
	pub is_active: Option<bool>,
	/// Only posts whose title contains this text, ignoring case.
	///
	/// Case is folded with Unicode rules in memory. PostgreSQL folds with
	/// `lower()`, which only covers ASCII when the database uses the `C` locale.
	pub search: Option<String>,
	/// The number of matching posts to skip.
	pub offset: i64,
	/// The maximum number of posts to return.
	pub limit: i64,
}

impl Filter {
	pub fn matches(&self, post: &BlogPost) -> bool {
		if self.is_active.is_some_and(|is_active| post.is_active != is_active) {
			return false;
		}

		match &self.search {
			Some(search) => post.title.to_lowercase().contains(&search.to_lowercase()),
			None => true,
		}
	}
}

/// The default listing order: title, then creation time, then id.
///
/// Titles compare by code point, which matches the `"C"` collation used by
/// the PostgreSQL store.
pub fn default_order(a: &BlogPost, b: &BlogPost) -> Ordering {
	a.title
		.cmp(&b.title)
		.then_with(|| a.created_at().cmp(&b.created_at()))
		.then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
	/// Inserts a new post, assigning `created_at` and `updated_at`.
	async fn create(&self, input: CreateBlogPost) -> Result<BlogPost, Error>;

	async fn get(&self, id: Uuid) -> Result<BlogPost, Error>;

	/// Applies the fields present in `input` and refreshes `updated_at`.
	async fn update(&self, id: Uuid, input: UpdateBlogPost) -> Result<BlogPost, Error>;

	async fn delete(&self, id: Uuid) -> Result<(), Error>;

	/// Returns the posts matching `filter` in [`default_order`].
	///
	/// Nothing is read until the stream is first polled, and every call starts over.
	fn list(&self, filter: Filter) -> BoxStream<'_, Result<BlogPost, Error>>;

	/// Sets or clears an attachment reference and refreshes `updated_at`.
	async fn set_attachment(
		&self,
		id: Uuid,
		attachment: Attachment,
		reference: Option<String>,
	) -> Result<BlogPost, Error>;
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::model::{self, CreatedAtFields};

	fn post(title: &str, created_at: chrono::DateTime<chrono::Utc>) -> BlogPost {
		BlogPost {
			id: Uuid::new_v4(),
			title: title.into(),
			text: "text".into(),
			is_active: true,
			created: CreatedAtFields { created_at },
			updated_at: created_at,
			website: None,
			document: None,
			picture: None,
		}
	}

	#[test]
	fn test_default_order() {
		let now = model::now();
		let later = now + chrono::Duration::seconds(1);

		let mut posts = vec![post("b", now), post("a", later), post("a", now), post("B", now)];
		posts.sort_by(default_order);

		let order = posts
			.iter()
			.map(|p| (p.title.as_str(), p.created_at()))
			.collect::<Vec<_>>();

		assert_eq!(order, vec![("B", now), ("a", now), ("a", later), ("b", now)]);
	}

	#[test]
	fn test_filter_matches() {
		let mut p = post("Hello World", model::now());

		assert!(Filter::default().matches(&p));
		assert!(Filter {
			search: Some("WORLD".into()),
			..Default::default()
		}
		.matches(&p));
		assert!(!Filter {
			search: Some("moon".into()),
			..Default::default()
		}
		.matches(&p));

		let georgian = post("ᲑᲚᲝᲒᲘ", model::now());

		assert!(Filter {
			search: Some("ბლოგ".into()),
			..Default::default()
		}
		.matches(&georgian));

		p.is_active = false;

		assert!(!Filter {
			is_active: Some(true),
			..Default::default()
		}
		.matches(&p));
	}
}
