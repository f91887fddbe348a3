pub use crate::{
	model::{BlogPost, CreateBlogPost, UpdateBlogPost},
	route::model::IdInput,
};

use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::store::Filter;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

/// Query parameters for listing posts.
///
/// Posts are ordered by title, then by creation time.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct ListInput {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of posts to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "ten")]
	pub size: i64,
	/// Only return posts that are (or are not) active.
	pub is_active: Option<bool>,
	/// Only return posts whose title contains this text, ignoring case.
	#[validate(length(min = 1, max = 255))]
	pub search: Option<String>,
}

impl ListInput {
	pub fn offset(&self) -> i64 {
		(self.page - 1).saturating_mul(self.size)
	}

	pub fn limit(&self) -> i64 {
		self.size
	}
}

impl From<ListInput> for Filter {
	fn from(input: ListInput) -> Self {
		Self {
			offset: input.offset(),
			limit: input.limit(),
			is_active: input.is_active,
			search: input.search,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn list(page: i64, size: i64) -> ListInput {
		ListInput {
			page,
			size,
			is_active: None,
			search: None,
		}
	}

	#[test]
	fn test_list_offset() {
		let mut input = list(1, 10);

		assert_eq!(input.offset(), 0);

		input.page = 2;

		assert_eq!(input.offset(), 10);

		input.size = 5;

		assert_eq!(input.offset(), 5);

		input.page = 3;

		assert_eq!(input.offset(), 10);
	}

	#[test]
	fn test_list_limit() {
		assert_eq!(list(1, 10).limit(), 10);
	}

	#[test]
	fn test_list_validation() {
		assert!(list(1, 100).validate().is_ok());
		assert!(list(0, 10).validate().is_err());
		assert!(list(1, 101).validate().is_err());
	}

	#[test]
	fn test_into_filter() {
		let mut input = list(3, 20);
		input.search = Some("rust".into());
		input.is_active = Some(true);

		let filter = Filter::from(input);

		assert_eq!(filter.offset, 40);
		assert_eq!(filter.limit, 20);
		assert_eq!(filter.search.as_deref(), Some("rust"));
		assert_eq!(filter.is_active, Some(true));
	}
}
