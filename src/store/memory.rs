use std::collections::HashMap;

use futures::{stream, stream::BoxStream, StreamExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{default_order, Error, Filter, Store};
use crate::model::{self, Attachment, BlogPost, CreateBlogPost, UpdateBlogPost};

/// A [`Store`] that keeps posts in memory.
///
/// Every operation holds the lock for its whole duration, so writers are
/// serialised the same way a database transaction would serialise them.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
	posts: HashMap<Uuid, BlogPost>,
	/// Unique index over `(title, text)`.
	title_text: HashMap<(String, String), Uuid>,
}

impl Tables {
	fn key(post: &BlogPost) -> (String, String) {
		(post.title.clone(), post.text.clone())
	}

	/// Fails if another post already owns `key`.
	fn check_unique(&self, key: &(String, String), id: Option<Uuid>) -> Result<(), Error> {
		match self.title_text.get(key) {
			Some(owner) if Some(*owner) != id => Err(Error::Duplicate),
			_ => Ok(()),
		}
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl Store for MemoryStore {
	#[tracing::instrument(skip_all)]
	async fn create(&self, input: CreateBlogPost) -> Result<BlogPost, Error> {
		let mut tables = self.tables.write().await;

		let post = BlogPost::new(input, model::now());
		let key = Tables::key(&post);

		tables.check_unique(&key, None)?;
		tables.title_text.insert(key, post.id);
		tables.posts.insert(post.id, post.clone());

		Ok(post)
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, id: Uuid) -> Result<BlogPost, Error> {
		let tables = self.tables.read().await;

		tables.posts.get(&id).cloned().ok_or(Error::NotFound(id))
	}

	#[tracing::instrument(skip(self, input))]
	async fn update(&self, id: Uuid, input: UpdateBlogPost) -> Result<BlogPost, Error> {
		let mut tables = self.tables.write().await;

		let mut post = tables.posts.get(&id).cloned().ok_or(Error::NotFound(id))?;
		let old_key = Tables::key(&post);

		post.apply(input, model::now());

		let new_key = Tables::key(&post);

		if new_key != old_key {
			tables.check_unique(&new_key, Some(id))?;
			tables.title_text.remove(&old_key);
			tables.title_text.insert(new_key, id);
		}

		tables.posts.insert(id, post.clone());

		Ok(post)
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, id: Uuid) -> Result<(), Error> {
		let mut tables = self.tables.write().await;

		let post = tables.posts.remove(&id).ok_or(Error::NotFound(id))?;
		tables.title_text.remove(&Tables::key(&post));

		Ok(())
	}

	fn list(&self, filter: Filter) -> BoxStream<'_, Result<BlogPost, Error>> {
		stream::once(async move {
			let tables = self.tables.read().await;

			let mut posts = tables
				.posts
				.values()
				.filter(|post| filter.matches(post))
				.cloned()
				.collect::<Vec<_>>();

			posts.sort_by(default_order);

			let offset = usize::try_from(filter.offset).unwrap_or(0);
			let limit = usize::try_from(filter.limit).unwrap_or(0);

			stream::iter(posts.into_iter().skip(offset).take(limit).map(Ok))
		})
		.flatten()
		.boxed()
	}

	#[tracing::instrument(skip(self))]
	async fn set_attachment(
		&self,
		id: Uuid,
		attachment: Attachment,
		reference: Option<String>,
	) -> Result<BlogPost, Error> {
		let mut tables = self.tables.write().await;

		let post = tables.posts.get_mut(&id).ok_or(Error::NotFound(id))?;
		post.set_attachment(attachment, reference, model::now());

		Ok(post.clone())
	}
}

#[cfg(test)]
mod test {
	use futures::TryStreamExt;

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

	fn rename(title: &str) -> UpdateBlogPost {
		UpdateBlogPost {
			title: Some(title.into()),
			text: None,
			is_active: None,
			website: None,
			document: None,
			picture: None,
		}
	}

	fn all() -> Filter {
		Filter {
			limit: i64::MAX,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_create_then_get() {
		let store = MemoryStore::new();

		let created = store.create(input("ა", "ტესტი")).await.unwrap();
		let fetched = store.get(created.id).await.unwrap();

		assert_eq!(created, fetched);
		assert!(fetched.is_active);
		assert_eq!(fetched.created_at(), fetched.updated_at);
	}

	#[tokio::test]
	async fn test_duplicate_title_and_text() {
		let store = MemoryStore::new();

		store.create(input("ა", "ტესტი")).await.unwrap();

		assert!(matches!(
			store.create(input("ა", "ტესტი")).await,
			Err(Error::Duplicate)
		));

		// Same title with a different body is fine
		store.create(input("ა", "სხვა")).await.unwrap();
	}

	#[tokio::test]
	async fn test_update_collision() {
		let store = MemoryStore::new();

		store.create(input("a", "text")).await.unwrap();
		let b = store.create(input("b", "text")).await.unwrap();

		assert!(matches!(
			store.update(b.id, rename("a")).await,
			Err(Error::Duplicate)
		));

		// The failed update must not have touched the index
		let b = store.update(b.id, rename("c")).await.unwrap();
		store.create(input("b", "text")).await.unwrap();

		assert_eq!(b.title, "c");
	}

	#[tokio::test]
	async fn test_update_timestamps() {
		let store = MemoryStore::new();
		let post = store.create(input("a", "text")).await.unwrap();

		let mut previous = post.updated_at;

		for title in ["b", "c", "c"] {
			let updated = store.update(post.id, rename(title)).await.unwrap();

			assert_eq!(updated.created_at(), post.created_at());
			assert!(updated.updated_at >= previous);

			previous = updated.updated_at;
		}
	}

	#[tokio::test]
	async fn test_unknown_id() {
		let store = MemoryStore::new();
		let id = Uuid::new_v4();

		assert!(matches!(store.get(id).await, Err(Error::NotFound(x)) if x == id));
		assert!(matches!(store.update(id, rename("a")).await, Err(Error::NotFound(_))));
		assert!(matches!(store.delete(id).await, Err(Error::NotFound(_))));
		assert!(matches!(
			store.set_attachment(id, Attachment::Document, None).await,
			Err(Error::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_delete_frees_title_and_text() {
		let store = MemoryStore::new();
		let post = store.create(input("a", "text")).await.unwrap();

		store.delete(post.id).await.unwrap();
		store.create(input("a", "text")).await.unwrap();
	}

	#[tokio::test]
	async fn test_list_order_and_restart() {
		let store = MemoryStore::new();

		for title in ["c", "a", "b"] {
			store.create(input(title, "text")).await.unwrap();
		}
		store.create(input("a", "other")).await.unwrap();

		let first = store.list(all()).try_collect::<Vec<_>>().await.unwrap();
		let second = store.list(all()).try_collect::<Vec<_>>().await.unwrap();

		let titles = first.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();

		assert_eq!(titles, vec!["a", "a", "b", "c"]);
		assert!(first[0].created_at() <= first[1].created_at());
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_list_is_lazy() {
		let store = MemoryStore::new();
		let stream = store.list(all());

		// Created after the stream, but before it is polled
		store.create(input("a", "text")).await.unwrap();

		assert_eq!(stream.try_collect::<Vec<_>>().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_list_pagination() {
		let store = MemoryStore::new();

		for title in ["a", "b", "c", "d", "e"] {
			store.create(input(title, "text")).await.unwrap();
		}

		let page = store
			.list(Filter {
				offset: 2,
				limit: 2,
				..Default::default()
			})
			.try_collect::<Vec<_>>()
			.await
			.unwrap();

		let titles = page.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();

		assert_eq!(titles, vec!["c", "d"]);
	}

	#[tokio::test]
	async fn test_set_attachment() {
		let store = MemoryStore::new();
		let post = store.create(input("a", "text")).await.unwrap();

		let post = store
			.set_attachment(
				post.id,
				Attachment::Document,
				Some("blog_post_documents/a.pdf".into()),
			)
			.await
			.unwrap();

		assert_eq!(post.document.as_deref(), Some("blog_post_documents/a.pdf"));

		let post = store
			.set_attachment(post.id, Attachment::Document, None)
			.await
			.unwrap();

		assert_eq!(post.document, None);
		assert!(post.updated_at >= post.created_at());
	}
}
