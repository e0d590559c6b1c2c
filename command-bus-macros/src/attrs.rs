use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Ident, Lit, LitStr, Result as SynResult, Token, parse::Parse, parse::ParseStream, spanned::Spanned};

/// 属性中的单个条目：`key` 或 `key = value`
pub(crate) struct AttrKv {
    pub(crate) key: Ident,
    pub(crate) value: Option<Expr>,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let key: Ident = input.parse()?;
        let value = if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            Some(input.parse()?)
        } else {
            None
        };
        Ok(Self { key, value })
    }
}

/// 收集所有 `#[name(...)]` 属性中的条目
pub(crate) fn collect_kvs(attrs: &[Attribute], name: &str) -> SynResult<Vec<AttrKv>> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident(name)) {
        let pairs =
            attr.parse_args_with(Punctuated::<AttrKv, Token![,]>::parse_terminated)?;
        out.extend(pairs);
    }
    Ok(out)
}

pub(crate) fn expect_flag(kv: &AttrKv) -> SynResult<()> {
    match &kv.value {
        None => Ok(()),
        Some(v) => Err(syn::Error::new(
            v.span(),
            format!("'{}' does not take a value", kv.key),
        )),
    }
}

pub(crate) fn expect_str(kv: &AttrKv) -> SynResult<LitStr> {
    match &kv.value {
        Some(Expr::Lit(syn::ExprLit {
            lit: Lit::Str(lit), ..
        })) => Ok(lit.clone()),
        Some(other) => Err(syn::Error::new(
            other.span(),
            format!("expected string literal for '{}'", kv.key),
        )),
        None => Err(syn::Error::new(
            kv.key.span(),
            format!("'{}' requires a value, e.g. {} = \"...\"", kv.key, kv.key),
        )),
    }
}

pub(crate) fn expect_int(kv: &AttrKv) -> SynResult<syn::LitInt> {
    match &kv.value {
        Some(Expr::Lit(syn::ExprLit {
            lit: Lit::Int(lit), ..
        })) => Ok(lit.clone()),
        Some(other) => Err(syn::Error::new(
            other.span(),
            format!("expected integer literal for '{}'", kv.key),
        )),
        None => Err(syn::Error::new(
            kv.key.span(),
            format!("'{}' requires a value", kv.key),
        )),
    }
}

// 同一键重复出现时报错
pub(crate) fn set_once<T>(slot: &mut Option<T>, kv: &AttrKv, value: T) -> SynResult<()> {
    if slot.is_some() {
        return Err(syn::Error::new(
            kv.key.span(),
            format!("duplicate key '{}' in attribute", kv.key),
        ));
    }
    *slot = Some(value);
    Ok(())
}
