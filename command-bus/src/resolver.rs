//! 处理器解析（HandlerResolver）
//!
//! 对每个命令类型按以下优先级确定处理器描述：
//! 1. 自处理命令：处理器即命令自身，方法为 `handle`；
//! 2. 显式映射表；
//! 3. 映射函数（mapper），结果可按命令名缓存；
//! 4. 以上皆无则返回 `UnregisteredCommand`。
//!
use crate::command::AnyCommand;
use crate::descriptor::HandlerDescriptor;
use crate::error::{BusError, BusResult};
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// 映射函数：从命令推导处理器描述
pub type Mapper = Arc<dyn Fn(&dyn AnyCommand) -> HandlerDescriptor + Send + Sync>;

/// 约定式映射函数，见 [`HandlerDescriptor::simple_mapping`]
pub fn simple_mapper(command_prefix: impl Into<String>, handler_prefix: impl Into<String>) -> Mapper {
    let command_prefix = command_prefix.into();
    let handler_prefix = handler_prefix.into();

    Arc::new(move |command: &dyn AnyCommand| {
        HandlerDescriptor::simple_mapping(command, &command_prefix, &handler_prefix)
    })
}

#[derive(Default)]
pub struct HandlerResolver {
    mappings: DashMap<String, HandlerDescriptor>,
    mapper: RwLock<Option<Mapper>>,
    cache: Option<DashMap<String, HandlerDescriptor>>,
}

impl HandlerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启映射函数结果缓存（按命令名）
    pub fn with_mapper_cache(mut self) -> Self {
        self.cache = Some(DashMap::new());
        self
    }

    /// 合并映射：同名命令后注册者覆盖先注册者
    pub fn maps<I, K>(&self, mappings: I)
    where
        I: IntoIterator<Item = (K, HandlerDescriptor)>,
        K: Into<String>,
    {
        for (command, descriptor) in mappings {
            let command = command.into();
            if let Some(cache) = &self.cache {
                cache.remove(&command);
            }
            self.mappings.insert(command, descriptor);
        }
    }

    /// 替换映射函数；`None` 表示清除
    pub fn set_mapper(&self, mapper: Option<Mapper>) {
        *self.mapper.write().unwrap_or_else(PoisonError::into_inner) = mapper;
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn has_mapper(&self) -> bool {
        self.mapper
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 确定命令的处理器描述
    pub fn descriptor_for(&self, command: &dyn AnyCommand) -> BusResult<HandlerDescriptor> {
        let name = command.command_name();

        if command.is_self_handling() {
            return Ok(HandlerDescriptor::handle(name));
        }

        if let Some(descriptor) = self.mappings.get(name).map(|d| d.clone()) {
            return Ok(descriptor);
        }

        if let Some(descriptor) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(name).map(|d| d.clone()))
        {
            return Ok(descriptor);
        }

        let mapper = self
            .mapper
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(mapper) = mapper {
            let descriptor = mapper(command);
            debug!(
                target: crate::DISPATCH_TARGET,
                command = name,
                handler = %descriptor,
                "handler derived by mapper"
            );
            if let Some(cache) = &self.cache {
                cache.insert(name.to_owned(), descriptor.clone());
            }
            return Ok(descriptor);
        }

        Err(BusError::UnregisteredCommand(name.to_owned()))
    }

    /// 已显式映射的命令名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mappings.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}
