mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates a `XForm` struct for the model, holding the fields a client is allowed to submit.
///
/// Fields with #[serde(skip_deserializing)] or #[serde(skip)] are left out, all other
/// fields are included verbatim (including attributes). A `From<&X>` implementation
/// is generated so an existing entity can pre-fill its own edit form.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
