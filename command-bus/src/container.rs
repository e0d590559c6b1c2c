//! 对象构造容器（Container）
//!
//! 分发器通过容器按类型标识构造处理器，并向自处理命令注入依赖。
//! `InMemoryContainer` 为基于 `DashMap` 的进程内实现。
//!
use crate::{
    error::{BusError, BusResult},
    handler::Handler,
};
use dashmap::{DashMap, DashSet};
use std::any::{Any, TypeId};
use std::sync::Arc;

pub trait Container: Send + Sync {
    /// 按处理器类型标识构造（或取得）处理器
    fn make(&self, handler: &str) -> BusResult<Arc<dyn Handler>>;

    /// 处理器类型是否带有“应当入队”标记（不构造处理器）
    fn should_queue(&self, handler: &str) -> bool;

    /// 按类型取共享实例，用于依赖注入
    fn instance(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl<'c> dyn Container + 'c {
    /// 类型化取实例
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance(TypeId::of::<T>())?.downcast::<T>().ok()
    }
}

type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// 基于内存的容器实现
/// - 通过处理器类型标识注册工厂或单例
/// - 通过 `TypeId` 注册依赖实例
#[derive(Default)]
pub struct InMemoryContainer {
    factories: DashMap<String, HandlerFactory>,
    queued: DashSet<String>,
    instances: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl InMemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器工厂：每次 `make` 构造新实例
    pub fn bind<F, H>(&self, handler: impl Into<String>, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        let f: HandlerFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn Handler>);
        self.factories.insert(handler.into(), f);
    }

    /// 注册处理器单例：每次 `make` 返回同一实例
    pub fn singleton<H>(&self, handler: impl Into<String>, instance: Arc<H>)
    where
        H: Handler + 'static,
    {
        let f: HandlerFactory = Arc::new(move || instance.clone() as Arc<dyn Handler>);
        self.factories.insert(handler.into(), f);
    }

    /// 为处理器类型打上“应当入队”标记
    pub fn mark_queued(&self, handler: impl Into<String>) {
        self.queued.insert(handler.into());
    }

    /// 注册依赖实例（按类型）
    pub fn provide<T: Any + Send + Sync>(&self, value: T) {
        self.instances.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// 获取已注册的处理器类型标识列表（只读视图）
    pub fn registered_handlers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}

impl Container for InMemoryContainer {
    fn make(&self, handler: &str) -> BusResult<Arc<dyn Handler>> {
        let Some(factory) = self.factories.get(handler).map(|f| f.clone()) else {
            return Err(BusError::HandlerNotBound(handler.to_owned()));
        };

        Ok(factory())
    }

    fn should_queue(&self, handler: &str) -> bool {
        self.queued.contains(handler)
    }

    fn instance(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.instances.get(&type_id).map(|v| v.clone())
    }
}
