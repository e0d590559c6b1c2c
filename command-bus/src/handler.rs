use crate::{
    command::Command,
    envelope::Envelope,
    error::{BusError, BusResult},
    reply::Reply,
};
use async_trait::async_trait;
use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// 类型化命令处理器
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    type Output: Send + 'static;

    async fn handle(&self, cmd: C) -> BusResult<Self::Output>;
}

/// 容器产出的处理器对象（类型擦除）
///
/// 按方法名调用，命令作为唯一参数。
#[async_trait]
pub trait Handler: Send + Sync {
    /// 处理器类型标识（与描述中的 handler 对应）
    fn handler_name(&self) -> &str;

    async fn call(&self, method: &str, envelope: Envelope) -> BusResult<Reply>;
}

type MethodFuture = Pin<Box<dyn Future<Output = BusResult<Reply>> + Send>>;

type MethodFn = Arc<dyn Fn(Envelope) -> MethodFuture + Send + Sync>;

/// 方法表：把“方法名 + 命令类型”绑定到类型化的处理逻辑
///
/// 同一方法名可以服务多个命令类型（按命令的 `TypeId` 区分）。
pub struct MethodTable {
    name: String,
    methods: HashMap<(String, TypeId), MethodFn>,
}

impl MethodTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    /// 通过 `CommandHandler<C>` 实现绑定方法
    pub fn on<C, H>(self, method: impl Into<String>, handler: Arc<H>) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.on_fn::<C, <H as CommandHandler<C>>::Output, _, _>(method, move |cmd| {
            let handler = handler.clone();
            async move { handler.handle(cmd).await }
        })
    }

    /// 通过闭包绑定方法
    pub fn on_fn<C, T, F, Fut>(mut self, method: impl Into<String>, f: F) -> Self
    where
        C: Command,
        T: Send + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<T>> + Send + 'static,
    {
        let f = Arc::new(f);

        let call: MethodFn = Arc::new(move |envelope: Envelope| -> MethodFuture {
            let f = f.clone();

            Box::pin(async move {
                let cmd = envelope.open::<C>()?;
                let out = f(cmd).await?;
                Ok::<_, BusError>(Reply::new(out))
            })
        });

        self.methods.insert((method.into(), TypeId::of::<C>()), call);
        self
    }

    /// 已绑定的方法名列表（只读视图）
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(|(m, _)| m.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[async_trait]
impl Handler for MethodTable {
    fn handler_name(&self) -> &str {
        &self.name
    }

    async fn call(&self, method: &str, envelope: Envelope) -> BusResult<Reply> {
        let key = (method.to_owned(), envelope.command().as_any().type_id());

        let Some(f) = self.methods.get(&key).cloned() else {
            return Err(BusError::MethodNotFound {
                handler: self.name.clone(),
                method: format!("{method}({})", envelope.command_name()),
            });
        };

        f(envelope).await
    }
}
