use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, Type, parse_macro_input};

/// Derive macro for `renderer::AsVertexLayout`.
///
/// Attribute formats are inferred from the field types. Supported types are `f32`, `u32`, `i32`,
/// `[f32; 2..=4]`, `[u32; 2..=4]`, `[i32; 2..=4]` and the glam vector types (`Vec3`, `UVec2`, ...).
/// Locations follow field order unless overridden.
///
/// Container attributes:
/// - `#[vertex(step_mode = Vertex)]` (default)
/// - `#[vertex(step_mode = Instance)]`
///
/// Field attributes:
/// - `#[vertex(location = <u32>)]` to pin a shader location.
/// - `#[vertex(skip)]` to leave a field (e.g. padding) out of the layout.
#[proc_macro_derive(AsVertexLayout, attributes(vertex))]
pub fn derive_as_vertex_layout(stream: TokenStream) -> TokenStream {
    let input = parse_macro_input!(stream as DeriveInput);

    let parsed = match parse_vertex_layout_struct(&input) {
        Ok(parsed) => parsed,
        Err(error) => return error.to_compile_error().into(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let step_mode = parsed.step_mode.variant_ident();

    let attributes = parsed.attributes.iter().map(|attribute| {
        let field_ident = &attribute.field_ident;
        let location = attribute.location;
        let format = Ident::new(attribute.format, proc_macro2::Span::call_site());

        quote! {
            renderer::VertexAttribute {
                format: renderer::VertexFormat::#format,
                offset: core::mem::offset_of!(#ident #ty_generics, #field_ident) as u64,
                shader_location: #location,
            }
        }
    });

    quote! {
        impl #impl_generics renderer::AsVertexLayout for #ident #ty_generics #where_clause {
            fn vertex_buffer_layout() -> renderer::VertexBufferLayout {
                const ATTRIBUTES: &[renderer::VertexAttribute] = &[
                    #(#attributes),*
                ];

                renderer::VertexBufferLayout {
                    array_stride: core::mem::size_of::<Self>() as u64,
                    step_mode: renderer::VertexStepMode::#step_mode,
                    attributes: ATTRIBUTES,
                }
            }
        }
    }
    .into()
}

struct ParsedVertexLayoutStruct {
    step_mode: ParsedVertexStepMode,
    attributes: Vec<ParsedVertexAttribute>,
}

struct ParsedVertexAttribute {
    field_ident: Ident,
    location: u32,
    /// Name of the `renderer::VertexFormat` variant.
    format: &'static str,
}

enum ParsedVertexStepMode {
    Vertex,
    Instance,
}

impl ParsedVertexStepMode {
    fn variant_ident(&self) -> Ident {
        match self {
            Self::Vertex => Ident::new("Vertex", proc_macro2::Span::call_site()),
            Self::Instance => Ident::new("Instance", proc_macro2::Span::call_site()),
        }
    }
}

/// Options found in a field's `#[vertex(...)]` attribute.
#[derive(Default)]
struct FieldOptions {
    location: Option<u32>,
    skip: bool,
}

/// Parse and validate the struct that `AsVertexLayout` is being derived for.
fn parse_vertex_layout_struct(input: &DeriveInput) -> syn::Result<ParsedVertexLayoutStruct> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new_spanned(
                    fields,
                    "AsVertexLayout supports only structs with named fields",
                ));
            }
            Fields::Unit => {
                return Err(syn::Error::new_spanned(
                    data.struct_token,
                    "AsVertexLayout requires at least one named field",
                ));
            }
        },
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "AsVertexLayout can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "AsVertexLayout can only be derived for structs",
            ));
        }
    };

    let step_mode = parse_vertex_step_mode(&input.attrs)?;

    let mut attributes = Vec::new();
    let mut next_location = 0_u32;

    for field in fields.iter() {
        let options = parse_field_options(field)?;
        if options.skip {
            continue;
        }

        let field_ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

        let format = infer_vertex_format(&field.ty)?;
        let location = options.location.unwrap_or(next_location);
        next_location = location + 1;

        attributes.push(ParsedVertexAttribute {
            field_ident,
            location,
            format,
        });
    }

    if attributes.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "AsVertexLayout requires at least one non-skipped field",
        ));
    }

    attributes.sort_by_key(|attribute| attribute.location);

    for pair in attributes.windows(2) {
        if pair[0].location == pair[1].location {
            return Err(syn::Error::new_spanned(
                &pair[1].field_ident,
                format!("duplicate vertex location {}", pair[0].location),
            ));
        }
    }

    Ok(ParsedVertexLayoutStruct {
        step_mode,
        attributes,
    })
}

/// Parse `#[vertex(step_mode = ...)]` from the target struct attributes.
fn parse_vertex_step_mode(attrs: &[syn::Attribute]) -> syn::Result<ParsedVertexStepMode> {
    let mut step_mode = ParsedVertexStepMode::Vertex;

    for attr in attrs {
        if !attr.path().is_ident("vertex") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("step_mode") {
                let ident = meta.value()?.parse::<Ident>()?;
                step_mode = match ident.to_string().as_str() {
                    "Vertex" => ParsedVertexStepMode::Vertex,
                    "Instance" => ParsedVertexStepMode::Instance,
                    _ => {
                        return Err(syn::Error::new_spanned(
                            ident,
                            "unsupported step mode, expected Vertex or Instance",
                        ));
                    }
                };
                Ok(())
            } else {
                Err(meta.error("unsupported vertex container option"))
            }
        })?;
    }

    Ok(step_mode)
}

/// Parse `#[vertex(location = <u32>)]` and `#[vertex(skip)]` on a field.
fn parse_field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("vertex") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("location") {
                if options.location.is_some() {
                    return Err(meta.error("duplicate location"));
                }
                let lit = meta.value()?.parse::<syn::LitInt>()?;
                options.location = Some(lit.base10_parse::<u32>()?);
                Ok(())
            } else if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported vertex field option"))
            }
        })?;
    }

    Ok(options)
}

/// Map a field type onto a `renderer::VertexFormat` variant name.
fn infer_vertex_format(ty: &Type) -> syn::Result<&'static str> {
    let unsupported = || syn::Error::new_spanned(ty, "unsupported vertex attribute type");

    match ty {
        Type::Path(path) => {
            let segment = path.path.segments.last().ok_or_else(unsupported)?;
            let format = match segment.ident.to_string().as_str() {
                "f32" => "Float32",
                "u32" => "Uint32",
                "i32" => "Sint32",
                "Vec2" => "Float32x2",
                "Vec3" => "Float32x3",
                "Vec4" => "Float32x4",
                "UVec2" => "Uint32x2",
                "UVec3" => "Uint32x3",
                "UVec4" => "Uint32x4",
                "IVec2" => "Sint32x2",
                "IVec3" => "Sint32x3",
                "IVec4" => "Sint32x4",
                _ => return Err(unsupported()),
            };
            Ok(format)
        }

        Type::Array(array) => {
            let element = infer_vertex_format(&array.elem)?;

            let len = match &array.len {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }) => lit.base10_parse::<usize>()?,
                _ => return Err(unsupported()),
            };

            let format = match (element, len) {
                ("Float32", 2) => "Float32x2",
                ("Float32", 3) => "Float32x3",
                ("Float32", 4) => "Float32x4",
                ("Uint32", 2) => "Uint32x2",
                ("Uint32", 3) => "Uint32x3",
                ("Uint32", 4) => "Uint32x4",
                ("Sint32", 2) => "Sint32x2",
                ("Sint32", 3) => "Sint32x3",
                ("Sint32", 4) => "Sint32x4",
                _ => return Err(unsupported()),
            };
            Ok(format)
        }

        _ => Err(unsupported()),
    }
}
