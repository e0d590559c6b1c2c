use crate::attrs::{collect_kvs, expect_str, set_once};
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Expr, Field, Fields, LitStr, Result as SynResult};

enum FieldDefault {
    None,
    Type,
    Expr(Expr),
}

struct MarshalField<'a> {
    field: &'a Field,
    key: LitStr,
    default: FieldDefault,
}

fn parse_field(field: &Field) -> SynResult<MarshalField<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.span(), "#[derive(Marshal)] requires named fields"))?;

    let mut rename: Option<LitStr> = None;
    let mut default: Option<FieldDefault> = None;

    for kv in collect_kvs(&field.attrs, "marshal")? {
        match kv.key.to_string().as_str() {
            "rename" => set_once(&mut rename, &kv, expect_str(&kv)?)?,
            "default" => {
                let d = match &kv.value {
                    Some(expr) => FieldDefault::Expr(expr.clone()),
                    None => FieldDefault::Type,
                };
                set_once(&mut default, &kv, d)?;
            }
            _ => {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key; expected 'rename' | 'default'",
                ));
            }
        }
    }

    // 去掉原始标识符前缀，`r#type` -> "type"
    let key = rename.unwrap_or_else(|| {
        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name);
        LitStr::new(name, ident.span())
    });

    Ok(MarshalField {
        field,
        key,
        default: default.unwrap_or(FieldDefault::None),
    })
}

/// #[derive(Marshal)] 宏实现
/// 仅支持具名字段结构体；参数顺序即字段声明顺序。
pub(crate) fn expand(input: DeriveInput) -> SynResult<TokenStream> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Marshal)] supports only named-field structs",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Marshal)] only on struct",
            ));
        }
    };

    let fields = named
        .named
        .iter()
        .map(parse_field)
        .collect::<SynResult<Vec<_>>>()?;

    let parameters = fields.iter().map(|f| {
        let key = &f.key;
        let ty = &f.field.ty;
        match &f.default {
            FieldDefault::None => quote! {
                ::command_bus::marshal::Parameter::required(#key)
            },
            FieldDefault::Type => quote! {
                ::command_bus::marshal::Parameter::optional(
                    #key,
                    <#ty as ::core::default::Default>::default(),
                )
            },
            FieldDefault::Expr(expr) => quote! {
                ::command_bus::marshal::Parameter::optional(#key, #expr)
            },
        }
    });

    let assignments = fields.iter().map(|f| {
        let ident = &f.field.ident;
        quote! { #ident: args.take()? }
    });

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::command_bus::marshal::Marshal for #ident #ty_generics #where_clause {
            fn parameters() -> ::std::vec::Vec<::command_bus::marshal::Parameter> {
                ::std::vec![ #( #parameters ),* ]
            }

            #[allow(unused_mut)]
            fn from_arguments(
                mut args: ::command_bus::marshal::Arguments,
            ) -> ::command_bus::error::BusResult<Self> {
                ::core::result::Result::Ok(Self {
                    #( #assignments, )*
                })
            }
        }
    })
}
