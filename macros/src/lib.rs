mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the summary, the rest becomes the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Turns a struct into a stored entity of the given collection.
///
/// Generates `CreateX` and `UpdateX` input structs and an implementation of
/// `crate::content::Entity`. Fields are marked with:
///
/// - `#[model(id)]`: the document id, excluded from inputs
/// - `#[model(owner)]`: the owning account id, excluded from inputs
/// - `#[model(skip)]`: any other store-assigned field, excluded from inputs
///
/// All other fields (including their attributes) are copied verbatim into
/// `CreateX`, and wrapped in an `Option` in `UpdateX`.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(args, input)
}
