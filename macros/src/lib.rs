mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates two new structs, `CreateX` and `UpdateX`, for the model `X`.
///
/// Fields marked `#[serde(skip_deserializing)]`, `#[serde(skip)]` or `#[serde(flatten)]`
/// are server-managed and left out of both. All other fields are copied verbatim
/// (including attributes). In `UpdateX` every field is optional: non-`Option` fields are
/// wrapped in `Option` and lose their `#[serde(default)]`. Row-only derives such as
/// `sqlx::FromRow` are not copied.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
