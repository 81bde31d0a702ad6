//! Proc macros for story schema generation.
//!
//! Provides `#[derive(Schema)]` to generate a JSON schema from a record
//! type, and `#[derive(Tool)]` to additionally expose that schema as a
//! Claude tool definition.
//!
//! # Example
//!
//! ```ignore
//! /// A line of dialogue
//! #[derive(Schema)]
//! struct DialogueLine {
//!     /// Who speaks
//!     character: String,
//!     line: String,
//! }
//!
//! /// Submit a finished story
//! #[derive(Tool)]
//! #[tool(name = "submit_story")]
//! struct SubmitStory {
//!     title: String,
//!     dialogue: Vec<DialogueLine>,
//!     #[tool(rename = "nextSceneId")]
//!     next_scene_id: Option<String>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, GenericArgument, Lit, Meta, PathArguments, Type};

/// Derive `json_schema()` for a struct with named fields.
///
/// # Attributes
///
/// - `#[tool(optional)]` on fields - Leave the field out of `required`
/// - `#[tool(rename = "...")]` on fields - Override the property name
///
/// Fields whose type is not a primitive, `Option`, `Vec` or a string-keyed
/// map must themselves derive `Schema` (or `Tool`).
#[proc_macro_derive(Schema, attributes(tool))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_schema(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derive a Claude tool definition whose input schema is the struct's schema.
///
/// # Attributes
///
/// - `#[tool(name = "...")]` - Override the tool name (defaults to snake_case struct name)
/// - Field attributes as for `Schema`
#[proc_macro_derive(Tool, attributes(tool))]
pub fn derive_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_tool(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_schema(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let schema_body = schema_body(input)?;

    Ok(quote! {
        impl #struct_name {
            /// JSON schema describing this record.
            pub fn json_schema() -> serde_json::Value {
                #schema_body
            }
        }
    })
}

fn expand_tool(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let tool_name = get_tool_name(input)?;
    let description = get_doc_comment(&input.attrs);
    let schema_body = schema_body(input)?;

    Ok(quote! {
        impl #struct_name {
            /// JSON schema describing this record.
            pub fn json_schema() -> serde_json::Value {
                #schema_body
            }

            /// Get the tool name.
            pub fn tool_name() -> &'static str {
                #tool_name
            }

            /// Get the tool description.
            pub fn tool_description() -> &'static str {
                #description
            }

            /// Generate the JSON schema for this tool's input.
            pub fn input_schema() -> serde_json::Value {
                Self::json_schema()
            }

            /// Create a Tool definition for use with the Claude API.
            pub fn as_tool() -> claude::Tool {
                claude::Tool {
                    name: Self::tool_name().to_string(),
                    description: Self::tool_description().to_string(),
                    input_schema: Self::input_schema(),
                }
            }
        }
    })
}

/// Tokens building the object schema for the struct's named fields.
fn schema_body(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Schema derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Schema derive only supports structs",
            ))
        }
    };

    let mut property_tokens = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let field_name_str = get_field_name(field)?;
        let field_desc = get_doc_comment(&field.attrs);
        let field_type = &field.ty;
        let type_schema = type_to_schema(field_type);

        let property = if field_desc.is_empty() {
            type_schema
        } else {
            quote! {
                {
                    let mut property = #type_schema;
                    property["description"] = serde_json::json!(#field_desc);
                    property
                }
            }
        };

        property_tokens.push(quote! {
            properties.insert(#field_name_str.to_string(), #property);
        });

        if !is_field_optional(field) && !is_option_type(field_type) {
            required_fields.push(field_name_str);
        }
    }

    let description = get_doc_comment(&input.attrs);
    let schema_tokens = if description.is_empty() {
        quote! {
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required
            })
        }
    } else {
        quote! {
            serde_json::json!({
                "type": "object",
                "description": #description,
                "properties": properties,
                "required": required
            })
        }
    };

    Ok(quote! {
        let mut properties = serde_json::Map::new();
        #(#property_tokens)*

        let required: Vec<&str> = vec![#(#required_fields),*];

        #schema_tokens
    })
}

fn get_tool_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("tool") {
            let meta = attr.parse_args::<Meta>()?;
            if let Some(name) = name_value(&meta, "name") {
                return Ok(name);
            }
        }
    }

    Ok(to_snake_case(&input.ident.to_string()))
}

fn get_field_name(field: &Field) -> syn::Result<String> {
    for attr in &field.attrs {
        if attr.path().is_ident("tool") {
            if let Ok(meta) = attr.parse_args::<Meta>() {
                if let Some(rename) = name_value(&meta, "rename") {
                    return Ok(rename);
                }
            }
        }
    }

    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))
}

fn name_value(meta: &Meta, key: &str) -> Option<String> {
    let Meta::NameValue(nv) = meta else {
        return None;
    };
    if !nv.path.is_ident(key) {
        return None;
    }
    match &nv.value {
        syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn is_field_optional(field: &Field) -> bool {
    field.attrs.iter().any(|attr| {
        attr.path().is_ident("tool")
            && matches!(attr.parse_args::<Meta>(), Ok(Meta::Path(path)) if path.is_ident("optional"))
    })
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(s) = &expr_lit.lit {
                        docs.push(s.value().trim().to_string());
                    }
                }
            }
        }
    }
    docs.join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

/// Generic type arguments of the last path segment, in order.
fn generic_args(segment: &syn::PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn type_to_schema(ty: &Type) -> TokenStream2 {
    let Type::Path(type_path) = ty else {
        return quote! { serde_json::json!({}) };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({"type": "string"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
        "bool" => quote! { serde_json::json!({"type": "boolean"}) },
        "Option" | "Box" => match generic_args(segment).first() {
            Some(inner) => type_to_schema(inner),
            None => quote! { serde_json::json!({}) },
        },
        "Vec" => match generic_args(segment).first() {
            Some(inner) => {
                let inner_schema = type_to_schema(inner);
                quote! {
                    serde_json::json!({
                        "type": "array",
                        "items": #inner_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "array"}) },
        },
        "BTreeMap" | "HashMap" => match generic_args(segment).get(1) {
            Some(value) => {
                let value_schema = type_to_schema(value);
                quote! {
                    serde_json::json!({
                        "type": "object",
                        "additionalProperties": #value_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "object"}) },
        },
        "Value" => quote! { serde_json::json!({}) },
        _ => quote! { <#ty>::json_schema() },
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
