//! 分发前管道（Pipeline）
//!
//! 命令在解析处理器之前依次经过各个 `Pipe`：
//! - 调用 `next.run(envelope)` 继续传递（可先观察或替换信封）；
//! - 直接返回结果即短路，后续管道与处理器均不会执行。
//!
use crate::{envelope::Envelope, error::BusResult, reply::Reply};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Pipe: Send + Sync {
    async fn handle(&self, envelope: Envelope, next: Next<'_>) -> BusResult<Reply>;
}

/// 管道末端：解析并调用处理器
#[async_trait]
pub(crate) trait Terminal: Send + Sync {
    async fn finish(&self, envelope: Envelope) -> BusResult<Reply>;
}

/// 续体：剩余的管道与末端
pub struct Next<'a> {
    pipes: &'a [Arc<dyn Pipe>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub(crate) fn new(pipes: &'a [Arc<dyn Pipe>], terminal: &'a dyn Terminal) -> Self {
        Self { pipes, terminal }
    }

    /// 剩余管道数量
    pub fn remaining(&self) -> usize {
        self.pipes.len()
    }

    pub async fn run(self, envelope: Envelope) -> BusResult<Reply> {
        match self.pipes.split_first() {
            Some((pipe, rest)) => {
                let next = Next {
                    pipes: rest,
                    terminal: self.terminal,
                };
                pipe.handle(envelope, next).await
            }
            None => self.terminal.finish(envelope).await,
        }
    }
}
