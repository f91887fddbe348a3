use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{Error, Filter, Store};
use crate::model::{self, Attachment, BlogPost, CreateBlogPost, UpdateBlogPost};

/// Name of the unique index over `(title, text)`.
pub const TITLE_TEXT_KEY: &str = "blog_post_title_text_key";

/// A [`Store`] backed by PostgreSQL.
///
/// Concurrent writers are serialised by the database; the unique index
/// [`TITLE_TEXT_KEY`] reports collisions.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

/// Maps a unique violation on [`TITLE_TEXT_KEY`] to [`Error::Duplicate`].
fn map_unique(error: sqlx::Error) -> Error {
	match error {
		sqlx::Error::Database(ref d) if d.constraint() == Some(TITLE_TEXT_KEY) => Error::Duplicate,
		e => Error::Database(e),
	}
}

impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
		let pool = PgPoolOptions::new().connect(url).await?;

		Ok(Self::new(pool))
	}

	/// Applies the migrations in `migrations/`.
	pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
		sqlx::migrate!().run(&self.pool).await
	}
}

#[async_trait::async_trait]
impl Store for PgStore {
	#[tracing::instrument(skip_all)]
	async fn create(&self, input: CreateBlogPost) -> Result<BlogPost, Error> {
		let post = sqlx::query_as::<_, BlogPost>(
			r#"
				INSERT INTO blog_post (id, title, text, is_active, created_at, updated_at, website, document, picture)
				VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8)
				RETURNING *
			"#,
		)
		.bind(Uuid::new_v4())
		.bind(input.title)
		.bind(input.text)
		.bind(input.is_active)
		.bind(model::now())
		.bind(input.website)
		.bind(input.document)
		.bind(input.picture)
		.fetch_one(&self.pool)
		.await
		.map_err(map_unique)?;

		Ok(post)
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, id: Uuid) -> Result<BlogPost, Error> {
		let post = sqlx::query_as::<_, BlogPost>(
			r#"
				SELECT * FROM blog_post
				WHERE id = $1
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		post.ok_or(Error::NotFound(id))
	}

	#[tracing::instrument(skip(self, input))]
	async fn update(&self, id: Uuid, input: UpdateBlogPost) -> Result<BlogPost, Error> {
		let post = sqlx::query_as::<_, BlogPost>(
			r#"
				UPDATE blog_post
				SET
					title = COALESCE($2, title),
					text = COALESCE($3, text),
					is_active = COALESCE($4, is_active),
					website = COALESCE($5, website),
					document = COALESCE($6, document),
					picture = COALESCE($7, picture),
					updated_at = GREATEST($8, updated_at)
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(id)
		.bind(input.title)
		.bind(input.text)
		.bind(input.is_active)
		.bind(input.website)
		.bind(input.document)
		.bind(input.picture)
		.bind(model::now())
		.fetch_optional(&self.pool)
		.await
		.map_err(map_unique)?;

		post.ok_or(Error::NotFound(id))
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, id: Uuid) -> Result<(), Error> {
		let status = sqlx::query(
			r#"
				DELETE FROM blog_post
				WHERE id = $1
			"#,
		)
		.bind(id)
		.execute(&self.pool)
		.await?;

		if status.rows_affected() == 0 {
			return Err(Error::NotFound(id));
		}

		Ok(())
	}

	fn list(&self, filter: Filter) -> BoxStream<'_, Result<BlogPost, Error>> {
		sqlx::query_as::<_, BlogPost>(
			r#"
				SELECT * FROM blog_post
				WHERE ($1::boolean IS NULL OR is_active = $1)
					AND ($2::text IS NULL OR strpos(lower(title), lower($2)) > 0)
				ORDER BY title COLLATE "C", created_at, id
				LIMIT $3 OFFSET $4
			"#,
		)
		.bind(filter.is_active)
		.bind(filter.search)
		.bind(filter.limit)
		.bind(filter.offset)
		.fetch(&self.pool)
		.map_err(Error::from)
		.boxed()
	}

	#[tracing::instrument(skip(self))]
	async fn set_attachment(
		&self,
		id: Uuid,
		attachment: Attachment,
		reference: Option<String>,
	) -> Result<BlogPost, Error> {
		let query = match attachment {
			Attachment::Document => {
				r#"
					UPDATE blog_post
					SET document = $2, updated_at = GREATEST($3, updated_at)
					WHERE id = $1
					RETURNING *
				"#
			}
			Attachment::Picture => {
				r#"
					UPDATE blog_post
					SET picture = $2, updated_at = GREATEST($3, updated_at)
					WHERE id = $1
					RETURNING *
				"#
			}
		};

		let post = sqlx::query_as::<_, BlogPost>(query)
			.bind(id)
			.bind(reference)
			.bind(model::now())
			.fetch_optional(&self.pool)
			.await?;

		post.ok_or(Error::NotFound(id))
	}
}
