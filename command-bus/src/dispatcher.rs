use crate::{
    bus::CommandBus,
    command::{AnyCommand, Command},
    config::DispatcherConfig,
    container::Container,
    descriptor::HandlerDescriptor,
    envelope::Envelope,
    error::BusResult,
    handler::Handler,
    marshal::{self, Marshal, ValueSource},
    pipeline::{Next, Pipe, Terminal},
    queue::{self, QueueResolver, Receipt},
    reply::{Dispatched, Reply},
    resolver::{HandlerResolver, Mapper, simple_mapper},
};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

type OnResolved<'a> = dyn Fn(&dyn Handler) + Send + Sync + 'a;

/// 解析出的处理器
pub enum ResolvedHandler<'a, C> {
    /// 自处理命令：处理器即命令自身
    Command(&'a C),
    /// 由容器构造的处理器
    Handler(Arc<dyn Handler>),
}

/// 命令分发器
/// - 组合 编组、处理器解析、队列路由 与 分发前管道；
/// - 容器与队列解析器在构造时绑定，映射、映射函数与管道可在生命周期内替换。
pub struct Dispatcher {
    container: Arc<dyn Container>,
    queue_resolver: Option<QueueResolver>,
    resolver: HandlerResolver,
    pipes: RwLock<Arc<[Arc<dyn Pipe>]>>,
}

impl Dispatcher {
    /// 仅同步执行的分发器
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self::with_resolver(container, None, HandlerResolver::new())
    }

    /// 支持入队的分发器
    pub fn with_queue(container: Arc<dyn Container>, queue_resolver: QueueResolver) -> Self {
        Self::with_resolver(container, Some(queue_resolver), HandlerResolver::new())
    }

    /// 按配置构造
    pub fn from_config(
        container: Arc<dyn Container>,
        queue_resolver: Option<QueueResolver>,
        config: &DispatcherConfig,
    ) -> Self {
        let resolver = if config.cache_mapper_results {
            HandlerResolver::new().with_mapper_cache()
        } else {
            HandlerResolver::new()
        };

        let dispatcher = Self::with_resolver(container, queue_resolver, resolver);
        dispatcher.maps(config.mappings.clone());
        if let Some(mapping) = &config.simple_mapping {
            dispatcher
                .resolver
                .set_mapper(Some(simple_mapper(
                    mapping.command_prefix.as_str(),
                    mapping.handler_prefix.as_str(),
                )));
        }
        dispatcher
    }

    fn with_resolver(
        container: Arc<dyn Container>,
        queue_resolver: Option<QueueResolver>,
        resolver: HandlerResolver,
    ) -> Self {
        Self {
            container,
            queue_resolver,
            resolver,
            pipes: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    pub fn has_queue_resolver(&self) -> bool {
        self.queue_resolver.is_some()
    }

    // ---- 配置变更 ----

    /// 合并命令 -> 处理器映射
    pub fn maps<I, K>(&self, mappings: I)
    where
        I: IntoIterator<Item = (K, HandlerDescriptor)>,
        K: Into<String>,
    {
        self.resolver.maps(mappings);
    }

    /// 为单个命令类型注册映射
    pub fn map<C: Command>(&self, descriptor: HandlerDescriptor) {
        self.resolver.maps([(C::NAME, descriptor)]);
    }

    /// 替换映射函数
    pub fn map_using<F>(&self, mapper: F)
    where
        F: Fn(&dyn AnyCommand) -> HandlerDescriptor + Send + Sync + 'static,
    {
        self.resolver.set_mapper(Some(Arc::new(mapper) as Mapper));
    }

    /// 清除映射函数
    pub fn clear_mapper(&self) {
        self.resolver.set_mapper(None);
    }

    /// 替换分发前管道
    pub fn pipe_through<I>(&self, pipes: I) -> &Self
    where
        I: IntoIterator<Item = Arc<dyn Pipe>>,
    {
        let pipes: Arc<[Arc<dyn Pipe>]> = pipes.into_iter().collect();
        *self.pipes.write().unwrap_or_else(PoisonError::into_inner) = pipes;
        self
    }

    /// 已显式映射的命令名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<String> {
        self.resolver.registered_commands()
    }

    // ---- 处理器解析 ----

    pub fn handler_descriptor<C: Command>(&self, command: &C) -> BusResult<HandlerDescriptor> {
        self.resolver.descriptor_for(command)
    }

    pub fn handler_type<C: Command>(&self, command: &C) -> BusResult<String> {
        Ok(self.handler_descriptor(command)?.into_parts().0)
    }

    pub fn handler_method<C: Command>(&self, command: &C) -> BusResult<String> {
        Ok(self.handler_descriptor(command)?.into_parts().1)
    }

    pub fn resolve_handler<'a, C: Command>(
        &self,
        command: &'a C,
    ) -> BusResult<ResolvedHandler<'a, C>> {
        if command.as_self_handling().is_some() {
            return Ok(ResolvedHandler::Command(command));
        }

        let descriptor = self.handler_descriptor(command)?;
        Ok(ResolvedHandler::Handler(
            self.container.make(descriptor.handler())?,
        ))
    }

    // ---- 队列路由 ----

    /// 命令是否应当入队：命令自身带标记，或其处理器类型带标记
    pub fn should_queue<C: Command>(&self, command: &C) -> BusResult<bool> {
        Ok(self.queue_decision(command)?.0)
    }

    // 入队判断；需要查询处理器类型时一并返回解析出的描述，供同步路径复用
    fn queue_decision<C: Command>(
        &self,
        command: &C,
    ) -> BusResult<(bool, Option<HandlerDescriptor>)> {
        if command.should_queue() {
            return Ok((true, None));
        }

        if command.as_self_handling().is_some() {
            return Ok((false, None));
        }

        let descriptor = self.handler_descriptor(command)?;
        let queued = self.container.should_queue(descriptor.handler());
        Ok((queued, Some(descriptor)))
    }

    /// 将命令投递到队列
    pub async fn dispatch_to_queue<C: Command>(&self, command: C) -> BusResult<Receipt> {
        if self.queue_resolver.is_none() {
            warn!(
                target: crate::DISPATCH_TARGET,
                command = C::NAME,
                "queueing requested without a queue resolver"
            );
        }

        queue::submit(self.queue_resolver.as_ref(), command).await
    }

    // ---- 分发 ----

    /// 分发命令，`on_resolved` 在处理器解析后、调用前执行一次
    pub async fn dispatch_with<C, F>(&self, command: C, on_resolved: F) -> BusResult<Dispatched>
    where
        C: Command,
        F: Fn(&dyn Handler) + Send + Sync,
    {
        self.dispatch_inner(command, Some(&on_resolved as &OnResolved<'_>))
            .await
    }

    /// 同步执行命令（从不入队），`on_resolved` 语义同 [`Dispatcher::dispatch_with`]
    pub async fn dispatch_now_with<C, F>(&self, command: C, on_resolved: F) -> BusResult<Reply>
    where
        C: Command,
        F: Fn(&dyn Handler) + Send + Sync,
    {
        self.run_pipeline(
            Envelope::new(command),
            Some(&on_resolved as &OnResolved<'_>),
            None,
        )
        .await
    }

    /// 以覆盖值编组命令后分发
    pub async fn dispatch_from_array<C, E>(&self, values: &E) -> BusResult<Dispatched>
    where
        C: Marshal,
        E: ValueSource + Sync + ?Sized,
    {
        let command = marshal::marshal_from_array::<C, E>(values)?;
        self.dispatch_inner(command, None).await
    }

    /// 以取值源与覆盖值编组命令后分发
    pub async fn dispatch_from<C, S, E>(&self, source: &S, extras: &E) -> BusResult<Dispatched>
    where
        C: Marshal,
        S: ValueSource + Sync + ?Sized,
        E: ValueSource + Sync + ?Sized,
    {
        let command = marshal::marshal::<C, S, E>(source, extras)?;
        self.dispatch_inner(command, None).await
    }

    async fn dispatch_inner<C: Command>(
        &self,
        command: C,
        on_resolved: Option<&OnResolved<'_>>,
    ) -> BusResult<Dispatched> {
        let mut resolved = None;

        if self.queue_resolver.is_some() {
            let (queued, descriptor) = self.queue_decision(&command)?;
            if queued {
                debug!(target: crate::DISPATCH_TARGET, command = C::NAME, "routing command to queue");
                return self.dispatch_to_queue(command).await.map(Dispatched::Queued);
            }
            resolved = descriptor.map(|d| Resolved {
                command: C::NAME,
                descriptor: d,
            });
        }

        self.run_pipeline(Envelope::new(command), on_resolved, resolved)
            .await
            .map(Dispatched::Handled)
    }

    async fn run_pipeline(
        &self,
        envelope: Envelope,
        on_resolved: Option<&OnResolved<'_>>,
        resolved: Option<Resolved>,
    ) -> BusResult<Reply> {
        let pipes = self
            .pipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let terminal = Invoke {
            dispatcher: self,
            on_resolved,
            resolved,
        };

        Next::new(&pipes, &terminal).run(envelope).await
    }

    async fn invoke(
        &self,
        envelope: Envelope,
        on_resolved: Option<&OnResolved<'_>>,
        resolved: Option<&Resolved>,
    ) -> BusResult<Reply> {
        let command = envelope.command();

        if let Some(handling) = command.self_handling() {
            debug!(
                target: crate::DISPATCH_TARGET,
                command = command.command_name(),
                "self-handling command"
            );
            return handling.handle(self.container.as_ref()).await;
        }

        // 管道可能替换了命令，仅当命令未变时复用已解析的描述
        let descriptor = match resolved {
            Some(r) if r.command == command.command_name() => r.descriptor.clone(),
            _ => self.resolver.descriptor_for(command)?,
        };
        let handler = self.container.make(descriptor.handler())?;

        debug!(
            target: crate::DISPATCH_TARGET,
            command = command.command_name(),
            handler = %descriptor,
            "dispatching command to handler"
        );

        if let Some(on_resolved) = on_resolved {
            on_resolved(handler.as_ref());
        }

        handler.call(descriptor.method(), envelope).await
    }
}

/// 入队判断时已解析的处理器描述
struct Resolved {
    command: &'static str,
    descriptor: HandlerDescriptor,
}

/// 管道末端：解析处理器并执行信封中的命令
struct Invoke<'a> {
    dispatcher: &'a Dispatcher,
    on_resolved: Option<&'a OnResolved<'a>>,
    resolved: Option<Resolved>,
}

#[async_trait]
impl<'a> Terminal for Invoke<'a> {
    async fn finish(&self, envelope: Envelope) -> BusResult<Reply> {
        self.dispatcher
            .invoke(envelope, self.on_resolved, self.resolved.as_ref())
            .await
    }
}

#[async_trait]
impl CommandBus for Dispatcher {
    async fn dispatch<C: Command>(&self, command: C) -> BusResult<Dispatched> {
        self.dispatch_inner(command, None).await
    }

    async fn dispatch_now<C: Command>(&self, command: C) -> BusResult<Reply> {
        self.run_pipeline(Envelope::new(command), None, None).await
    }
}
