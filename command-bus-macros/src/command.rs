use crate::attrs::{collect_kvs, expect_flag, expect_int, expect_str, set_once};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitInt, LitStr, Result as SynResult};

#[derive(Default)]
struct CommandAttrConfig {
    name: Option<LitStr>,
    should_queue: Option<()>,
    queue: Option<LitStr>,
    delay: Option<LitInt>,
    connection: Option<LitStr>,
    self_handling: Option<()>,
    custom_queue: Option<()>,
}

fn parse_config(input: &DeriveInput) -> SynResult<CommandAttrConfig> {
    let mut cfg = CommandAttrConfig::default();

    for kv in collect_kvs(&input.attrs, "command")? {
        match kv.key.to_string().as_str() {
            "name" => set_once(&mut cfg.name, &kv, expect_str(&kv)?)?,
            "should_queue" => set_once(&mut cfg.should_queue, &kv, expect_flag(&kv)?)?,
            "queue" => set_once(&mut cfg.queue, &kv, expect_str(&kv)?)?,
            "delay" => set_once(&mut cfg.delay, &kv, expect_int(&kv)?)?,
            "connection" => set_once(&mut cfg.connection, &kv, expect_str(&kv)?)?,
            "self_handling" => set_once(&mut cfg.self_handling, &kv, expect_flag(&kv)?)?,
            "custom_queue" => set_once(&mut cfg.custom_queue, &kv, expect_flag(&kv)?)?,
            _ => {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key; expected 'name' | 'should_queue' | 'queue' | 'delay' | 'connection' | 'self_handling' | 'custom_queue'",
                ));
            }
        }
    }

    Ok(cfg)
}

/// #[derive(Command)] 宏实现
/// - `NAME` 默认为 `模块路径::类型名`，可用 `name = "..."` 覆盖
/// - 入队提示仅在显式给出时生成 `queue_hints`
pub(crate) fn expand(input: DeriveInput) -> SynResult<TokenStream> {
    let cfg = parse_config(&input)?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let name = match &cfg.name {
        Some(lit) => quote! { #lit },
        None => quote! { ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#ident)) },
    };

    let should_queue = cfg.should_queue.map(|_| {
        quote! {
            fn should_queue(&self) -> bool { true }
        }
    });

    let has_hints = cfg.queue.is_some() || cfg.delay.is_some() || cfg.connection.is_some();
    let queue_hints = has_hints.then(|| {
        let queue = cfg.queue.as_ref().map(|q| quote! { .queue(#q) });
        let delay = cfg
            .delay
            .as_ref()
            .map(|d| quote! { .delay(::std::time::Duration::from_secs(#d)) });
        let connection = cfg.connection.as_ref().map(|c| quote! { .connection(#c) });
        quote! {
            fn queue_hints(&self) -> ::command_bus::QueueHints {
                ::command_bus::QueueHints::builder()
                    #queue
                    #delay
                    #connection
                    .build()
            }
        }
    });

    let self_handling = cfg.self_handling.map(|_| {
        quote! {
            fn as_self_handling(&self) -> ::core::option::Option<&dyn ::command_bus::SelfHandling> {
                ::core::option::Option::Some(self)
            }
        }
    });

    let custom_queue = cfg.custom_queue.map(|_| {
        quote! {
            fn as_custom_queueing(&self) -> ::core::option::Option<&dyn ::command_bus::CustomQueueing> {
                ::core::option::Option::Some(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::command_bus::command::Command for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;

            #should_queue
            #queue_hints
            #self_handling
            #custom_queue
        }
    })
}
