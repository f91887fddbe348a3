use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Meta, Token};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Derives that only make sense on the stored row, not on request inputs.
const ROW_ONLY_DERIVES: &[&str] = &["FromRow"];

/// Returns true if the attribute is `#[serde(...)]` and mentions one of `idents`.
fn serde_mentions(attr: &syn::Attribute, idents: &[&str]) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	if !list.path.is_ident("serde") {
		return false;
	}

	list.tokens.to_token_stream().into_iter().any(|token| {
		matches!(token, TokenTree::Ident(ref ident) if idents.iter().any(|i| ident == i))
	})
}

fn is_option(ty: &syn::Type) -> bool {
	let syn::Type::Path(path) = ty else {
		return false;
	};

	path.path
		.segments
		.last()
		.is_some_and(|segment| segment.ident == "Option")
}

/// Rewrites `#[derive(...)]` attributes without the row-only derives.
fn input_attrs(attrs: &[syn::Attribute]) -> Vec<proc_macro2::TokenStream> {
	attrs
		.iter()
		.map(|attr| {
			if !attr.path().is_ident("derive") {
				return attr.to_token_stream();
			}

			let Ok(paths) =
				attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
			else {
				return attr.to_token_stream();
			};

			let paths = paths.into_iter().filter(|path| {
				path.segments
					.last()
					.map_or(true, |segment| !ROW_ONLY_DERIVES.iter().any(|d| segment.ident == d))
			});

			quote!(#[derive(#(#paths),*)])
		})
		.collect()
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}", ident);
	let update_ident = format_ident!("Update{}", ident);

	let attrs = input_attrs(&receiver.attrs);

	let fields = receiver.data.take_struct().expect("expected struct");
	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			// Server-managed fields: skipped, or flattened field sets like timestamps
			if field
				.attrs
				.iter()
				.any(|attr| serde_mentions(attr, &["skip_deserializing", "skip", "flatten"]))
			{
				return None;
			}

			Some((&field.attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		// A missing field means "unchanged", so defaults do not apply.
		let attrs = attrs.iter().filter(|attr| !serde_mentions(attr, &["default"]));

		if is_option(ty) {
			quote! {
				#(#attrs)*
				#vis #ident: #ty,
			}
		} else {
			quote! {
				#(#attrs)*
				#vis #ident: Option<#ty>,
			}
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident #generics {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#vis struct #update_ident #generics {
			#(
				#update_fields
			)*
		}
	}
	.into()
}
