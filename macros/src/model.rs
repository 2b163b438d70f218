use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use quote::{format_ident, quote};

#[derive(FromMeta)]
struct ModelArgs {
	collection: String,
}

#[derive(Default, FromMeta)]
#[darling(default)]
struct FieldArgs {
	id: bool,
	owner: bool,
	skip: bool,
}

pub fn from_input(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = match NestedMeta::parse_meta_list(args.into()) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let args = match ModelArgs::from_list(&args) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let mut input = syn::parse_macro_input!(input as syn::ItemStruct);

	let syn::Fields::Named(ref mut named) = input.fields else {
		return syn::Error::new_spanned(&input, "expected a struct with named fields")
			.into_compile_error()
			.into();
	};

	let mut id_field = None;
	let mut owner_field = None;
	let mut inputs = Vec::new();

	for field in &mut named.named {
		let mut marker = FieldArgs::default();
		let mut errors = Vec::new();

		// Strip `#[model(..)]` from the field, remembering what it said
		field.attrs.retain(|attr| {
			if !attr.path().is_ident("model") {
				return true;
			}

			match FieldArgs::from_meta(&attr.meta) {
				Ok(args) => {
					marker.id |= args.id;
					marker.owner |= args.owner;
					marker.skip |= args.skip;
				}
				Err(e) => errors.push(e),
			}

			false
		});

		if !errors.is_empty() {
			return darling::Error::multiple(errors).write_errors().into();
		}

		let Some(ident) = field.ident.clone() else {
			continue;
		};

		if marker.id {
			id_field = Some(ident);
		} else if marker.owner {
			owner_field = Some(ident);
		} else if !marker.skip {
			inputs.push(field.clone());
		}
	}

	let (Some(id_field), Some(owner_field)) = (id_field, owner_field) else {
		return syn::Error::new_spanned(
			&input.ident,
			"a model needs one #[model(id)] field and one #[model(owner)] field",
		)
		.into_compile_error()
		.into();
	};

	let ident = &input.ident;
	let vis = &input.vis;
	let attrs = &input.attrs;
	let create_ident = format_ident!("Create{}", ident);
	let update_ident = format_ident!("Update{}", ident);
	let collection = &args.collection;
	let owner_name = owner_field.to_string();

	let create_fields = inputs.iter().map(|field| {
		let attrs = &field.attrs;
		let vis = &field.vis;
		let ident = &field.ident;
		let ty = &field.ty;

		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = inputs.iter().map(|field| {
		let attrs = &field.attrs;
		let vis = &field.vis;
		let ident = &field.ident;
		let ty = &field.ty;

		quote! {
			#(#attrs)*
			#[serde(default, skip_serializing_if = "Option::is_none")]
			#vis #ident: Option<#ty>,
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#vis struct #update_ident {
			#(
				#update_fields
			)*
		}

		impl crate::content::Entity for #ident {
			const COLLECTION: &'static str = #collection;
			const OWNER_FIELD: &'static str = #owner_name;

			type Create = #create_ident;
			type Update = #update_ident;

			fn id(&self) -> crate::backend::DocumentId {
				self.#id_field
			}

			fn owner(&self) -> crate::backend::AccountId {
				self.#owner_field
			}
		}
	}
	.into()
}
