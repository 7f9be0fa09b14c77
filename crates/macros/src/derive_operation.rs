use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    Attribute, DeriveInput, Expr, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

#[derive(Debug)]
pub struct DeriveOperation {
    ident: Ident,
    kind: Ident,
    name: LitStr,
    domain: LitStr,
    description: LitStr,
    parameters: Vec<ParameterField>,
    setters: Vec<SetterField>,
}

#[derive(Debug)]
struct ParameterField {
    ident: Ident,
    name: LitStr,
    tag: TokenStream,
    default: Option<TokenStream>,
}

#[derive(Debug)]
struct SetterField {
    ident: Ident,
    method: LitStr,
    tag: TokenStream,
    with: Option<Ident>,
}

impl DeriveOperation {
    pub fn expand(self) -> TokenStream {
        let Self {
            ident,
            kind,
            name,
            domain,
            description,
            parameters,
            setters,
        } = self;

        let parameter_entries = parameters.iter().enumerate().map(|(position, param)| {
            let ParameterField {
                name, tag, default, ..
            } = param;
            let required = default.is_none();
            quote! {
                ::opbind_sdk::operation::Parameter {
                    name: #name,
                    ty: #tag,
                    required: #required,
                    position: #position,
                }
            }
        });

        let parameter_inits = parameters.iter().enumerate().map(|(position, param)| {
            let field = &param.ident;
            match &param.default {
                Some(default) => quote! {
                    #field: arguments.take_or_else(
                        &<Self as ::opbind_sdk::operation::Operation>::PARAMETERS[#position],
                        || #default,
                    )?
                },
                None => quote! {
                    #field: arguments.take(
                        &<Self as ::opbind_sdk::operation::Operation>::PARAMETERS[#position],
                    )?
                },
            }
        });

        let setter_inits = setters.iter().map(|setter| {
            let field = &setter.ident;
            quote! { #field: ::std::default::Default::default() }
        });

        let setter_entries = setters.iter().map(|setter| {
            let SetterField {
                ident: field,
                method,
                tag,
                with,
            } = setter;
            let assign = match with {
                Some(with) => quote! {
                    operation.#with(::opbind_sdk::__private::serde_json::from_value(value)?);
                },
                None => quote! {
                    operation.#field = ::opbind_sdk::__private::serde_json::from_value(value)?;
                },
            };
            quote! {
                ::opbind_sdk::operation::Setter::new(
                    #method,
                    #tag,
                    |operation: &mut Self,
                     value: ::opbind_sdk::__private::serde_json::Value|
                     -> ::std::result::Result<(), ::opbind_sdk::__private::serde_json::Error> {
                        #assign
                        ::std::result::Result::Ok(())
                    },
                )
            }
        });

        quote! {
            #[automatically_derived]
            impl ::opbind_sdk::operation::Operation for #ident {
                const NAME: &'static str = #name;
                const KIND: ::opbind_sdk::operation::OperationKind = ::opbind_sdk::operation::OperationKind::#kind;
                const DOMAIN: &'static str = #domain;
                const DESCRIPTION: &'static str = #description;
                const PARAMETERS: &'static [::opbind_sdk::operation::Parameter] = &[
                    #( #parameter_entries ),*
                ];

                fn setters() -> ::std::vec::Vec<::opbind_sdk::operation::Setter<Self>> {
                    ::std::vec![ #( #setter_entries ),* ]
                }

                #[allow(unused_mut, unused_variables)]
                fn construct(
                    mut arguments: ::opbind_sdk::operation::Arguments,
                ) -> ::std::result::Result<Self, ::opbind_sdk::error::BindError> {
                    ::std::result::Result::Ok(#ident {
                        #( #parameter_inits, )*
                        #( #setter_inits, )*
                    })
                }
            }
        }
    }
}

impl Parse for DeriveOperation {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let input: DeriveInput = input.parse()?;

        let mut kind = Ident::new("Query", Span::call_site());
        let mut name = LitStr::new(&input.ident.to_string(), input.ident.span());
        let mut domain = LitStr::new("", Span::call_site());

        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("operation")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("command") {
                    kind = Ident::new("Command", meta.path.span());
                } else if meta.path.is_ident("query") {
                    kind = Ident::new("Query", meta.path.span());
                } else if meta.path.is_ident("name") {
                    name = meta.value()?.parse()?;
                } else if meta.path.is_ident("domain") {
                    domain = meta.value()?.parse()?;
                } else {
                    return Err(meta.error("expected `command`, `query`, `name` or `domain`"));
                }
                Ok(())
            })?;
        }

        let description = LitStr::new(&doc_summary(&input.attrs), Span::call_site());

        let fields = match input.data {
            syn::Data::Struct(data) => match data.fields {
                Fields::Named(fields) => fields.named,
                Fields::Unit => Default::default(),
                Fields::Unnamed(fields) => {
                    return Err(syn::Error::new(
                        fields.span(),
                        "Operation requires named fields",
                    ));
                }
            },
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "Operation can only be derived for structs",
                ));
            }
        };

        let mut parameters = Vec::new();
        let mut setters = Vec::new();

        for field in fields {
            let Some(ident) = field.ident else {
                continue;
            };
            let field_name = ident.to_string();
            let field_name = field_name.trim_start_matches("r#");

            let mut rename: Option<LitStr> = None;
            let mut ty_override: Option<LitStr> = None;
            let mut default: Option<TokenStream> = None;
            let mut is_setter = false;
            let mut with: Option<Ident> = None;

            for attr in &field.attrs {
                if attr.path().is_ident("param") {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("rename") {
                            rename = Some(meta.value()?.parse()?);
                        } else if meta.path.is_ident("ty") {
                            ty_override = Some(meta.value()?.parse()?);
                        } else if meta.path.is_ident("default") {
                            if meta.input.peek(syn::Token![=]) {
                                let expr: Expr = meta.value()?.parse()?;
                                default = Some(quote! { #expr });
                            } else {
                                default = Some(quote! { ::std::default::Default::default() });
                            }
                        } else {
                            return Err(meta.error("expected `rename`, `ty` or `default`"));
                        }
                        Ok(())
                    })?;
                } else if attr.path().is_ident("setter") {
                    is_setter = true;
                    if let syn::Meta::List(_) = attr.meta {
                        attr.parse_nested_meta(|meta| {
                            if meta.path.is_ident("with") {
                                let method: LitStr = meta.value()?.parse()?;
                                with = Some(method.parse()?);
                            } else if meta.path.is_ident("rename") {
                                rename = Some(meta.value()?.parse()?);
                            } else if meta.path.is_ident("ty") {
                                ty_override = Some(meta.value()?.parse()?);
                            } else {
                                return Err(meta.error("expected `with`, `rename` or `ty`"));
                            }
                            Ok(())
                        })?;
                    }
                }
            }

            let tag = match &ty_override {
                Some(lit) => tag_from_name(&lit.value()),
                None => infer_tag(&field.ty),
            };

            if is_setter {
                let property = rename
                    .map(|lit| lit.value())
                    .unwrap_or_else(|| to_camel_case(field_name));
                let method = LitStr::new(&format!("set{}", upper_first(&property)), ident.span());
                setters.push(SetterField {
                    ident,
                    method,
                    tag,
                    with,
                });
            } else {
                if default.is_none() && is_option(&field.ty) {
                    default = Some(quote! { ::std::option::Option::None });
                }
                let name = rename.unwrap_or_else(|| {
                    LitStr::new(&to_camel_case(field_name), ident.span())
                });
                parameters.push(ParameterField {
                    ident,
                    name,
                    tag,
                    default,
                });
            }
        }

        Ok(DeriveOperation {
            ident: input.ident,
            kind,
            name,
            domain,
            description,
            parameters,
            setters,
        })
    }
}

/// First paragraph of the doc comment, joined on one line.
fn doc_summary(attrs: &[Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let syn::Meta::NameValue(meta) = &attr.meta else {
            continue;
        };
        let Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &meta.value
        else {
            continue;
        };
        let line = lit.value().trim().to_string();
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line);
    }
    lines.join(" ")
}

fn tag_from_name(name: &str) -> TokenStream {
    match name {
        "int" | "integer" => quote! { ::opbind_sdk::value::TypeTag::Int },
        "float" => quote! { ::opbind_sdk::value::TypeTag::Float },
        "bool" | "boolean" => quote! { ::opbind_sdk::value::TypeTag::Bool },
        "string" => quote! { ::opbind_sdk::value::TypeTag::String },
        "list" | "array" => quote! { ::opbind_sdk::value::TypeTag::List },
        "map" => quote! { ::opbind_sdk::value::TypeTag::Map },
        other => quote! { ::opbind_sdk::value::TypeTag::Named(#other) },
    }
}

fn infer_tag(ty: &Type) -> TokenStream {
    let Type::Path(path) = ty else {
        return tag_from_name("string");
    };
    let Some(segment) = path.path.segments.last() else {
        return tag_from_name("string");
    };

    let ident = segment.ident.to_string();
    match ident.as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => tag_from_name("int"),
        "f32" | "f64" => tag_from_name("float"),
        "bool" => tag_from_name("bool"),
        "String" | "str" => tag_from_name("string"),
        "Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "IndexSet" => tag_from_name("list"),
        "HashMap" | "BTreeMap" | "IndexMap" | "Map" => tag_from_name("map"),
        "Option" | "Box" => match first_generic(segment) {
            Some(inner) => infer_tag(inner),
            None => tag_from_name("string"),
        },
        other => tag_from_name(other),
    }
}

fn first_generic(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

/// `attribute_group_id` -> `attributeGroupId`
fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
