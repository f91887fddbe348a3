use aide::{openapi::Tag, transform::TransformOpenApi};

use crate::{error, extract::Json, model::BlogPost};

pub mod tag {
	pub const POST: &str = "Post";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title(&format!("{} API", BlogPost::VERBOSE_NAME))
		.summary("CRUD service for blog posts")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::POST.into(),
			description: Some(format!("{} management", BlogPost::VERBOSE_NAME_PLURAL)),
			..Default::default()
		})
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				success: false,
				errors: error::Message::new("error_code")
					.content("error message")
					.field("optional field")
					.detail("key", "value")
					.into_vec(),
			})
		})
}
