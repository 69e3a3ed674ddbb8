use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::Meta;

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

/// Returns true for fields marked with #[serde(skip_deserializing)] or #[serde(skip)].
fn is_server_assigned(attrs: &[syn::Attribute]) -> bool {
	attrs.iter().any(|attr| {
		let Meta::List(ref list) = attr.meta else {
			return false;
		};

		if !list.path.is_ident("serde") {
			return false;
		}

		list.tokens.to_token_stream().into_iter().any(|token| {
			matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
		})
	})
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
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
	let form_ident = format_ident!("{}Form", ident);

	// Only forward `#[derive]`, `#[serde]` and doc attributes, the model's own
	// `#[sqlx]` or `#[allow]` attributes have no meaning on the form.
	let attrs = receiver
		.attrs
		.iter()
		.filter(|attr| {
			let path = attr.path();
			path.is_ident("derive") || path.is_ident("serde") || path.is_ident("doc")
		})
		.collect::<Vec<_>>();

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "expected a struct with named fields")
			.into_compile_error()
			.into();
	};

	let fields = fields
		.iter()
		.filter(|field| !is_server_assigned(&field.attrs))
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			Some((&field.attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let form_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let copy_fields = fields.iter().map(|(_, ident, ..)| {
		quote! {
			#ident: ::std::clone::Clone::clone(&value.#ident),
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #form_ident #generics {
			#(
				#form_fields
			)*
		}

		impl #impl_generics ::std::convert::From<&#ident #ty_generics> for #form_ident #ty_generics #where_clause {
			fn from(value: &#ident #ty_generics) -> Self {
				Self {
					#(
						#copy_fields
					)*
				}
			}
		}
	}
	.into()
}
