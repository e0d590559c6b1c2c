//! 队列路由（Queue Routing）
//!
//! 本模块只决定“调用队列的哪个投递方法、传什么参数”，
//! 不涉及队列的存储、投递、重试与消费循环。
//!
use crate::command::Command;
use crate::error::{BusError, BusResult};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 队列（外部协作方）
///
/// 四种标准投递方式，返回由实现定义的回执。
#[async_trait]
pub trait Queue: Send + Sync {
    async fn push(&self, job: Job) -> BusResult<Receipt>;

    async fn push_on(&self, queue: &str, job: Job) -> BusResult<Receipt>;

    async fn later(&self, delay: Duration, job: Job) -> BusResult<Receipt>;

    async fn later_on(&self, queue: &str, delay: Duration, job: Job) -> BusResult<Receipt>;
}

/// 队列解析器：按连接标识（可选）返回队列；`None` 表示无可用队列
pub type QueueResolver = Arc<dyn Fn(Option<&str>) -> Option<Arc<dyn Queue>> + Send + Sync>;

/// 由闭包构造队列解析器
pub fn queue_resolver<F>(f: F) -> QueueResolver
where
    F: Fn(Option<&str>) -> Option<Arc<dyn Queue>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 入队任务：持有命令本身（共享、类型擦除）
#[derive(Clone)]
pub struct Job {
    name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Job {
    pub fn new<C: Command>(command: Arc<C>) -> Self {
        Self {
            name: C::NAME,
            payload: command,
        }
    }

    pub fn command_name(&self) -> &'static str {
        self.name
    }

    pub fn is<C: Command>(&self) -> bool {
        self.payload.is::<C>()
    }

    pub fn downcast<C: Command>(&self) -> Option<Arc<C>> {
        self.payload.clone().downcast::<C>().ok()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("command", &self.name)
            .finish_non_exhaustive()
    }
}

/// 队列回执（例如任务 ID）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    id: Option<String>,
}

impl Receipt {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// 无回执信息的确认
    pub fn acknowledged() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// 投递方式，按特异性从高到低选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// 命令自定义入队
    Custom,
    /// 指定队列 + 延迟
    LaterOn { queue: String, delay: Duration },
    /// 指定队列
    PushOn { queue: String },
    /// 延迟
    Later { delay: Duration },
    /// 立即入队
    Push,
}

impl Submission {
    pub fn select<C: Command>(command: &C) -> Self {
        if command.as_custom_queueing().is_some() {
            return Self::Custom;
        }

        let hints = command.queue_hints();
        match (hints.queue(), hints.delay()) {
            (Some(queue), Some(delay)) => Self::LaterOn {
                queue: queue.to_owned(),
                delay,
            },
            (Some(queue), None) => Self::PushOn {
                queue: queue.to_owned(),
            },
            (None, Some(delay)) => Self::Later { delay },
            (None, None) => Self::Push,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::LaterOn { .. } => "later_on",
            Self::PushOn { .. } => "push_on",
            Self::Later { .. } => "later",
            Self::Push => "push",
        }
    }
}

/// 将命令投递到解析出的队列
pub(crate) async fn submit<C: Command>(
    resolver: Option<&QueueResolver>,
    command: C,
) -> BusResult<Receipt> {
    let Some(resolver) = resolver else {
        return Err(BusError::QueueUnavailable(
            "no queue resolver configured".to_owned(),
        ));
    };

    let hints = command.queue_hints();
    let Some(queue) = resolver(hints.connection()) else {
        warn!(
            target: crate::DISPATCH_TARGET,
            command = C::NAME,
            connection = hints.connection(),
            "queue resolver returned no queue"
        );
        return Err(BusError::QueueUnavailable(format!(
            "queue resolver did not return a queue for connection {:?}",
            hints.connection()
        )));
    };

    let submission = Submission::select(&command);
    debug!(
        target: crate::DISPATCH_TARGET,
        command = C::NAME,
        submission = submission.as_str(),
        connection = hints.connection(),
        "submitting command to queue"
    );

    let command = Arc::new(command);
    let job = Job::new(command.clone());

    match submission {
        Submission::Custom => match command.as_custom_queueing() {
            Some(custom) => custom.queue(queue.as_ref(), job).await,
            None => queue.push(job).await,
        },
        Submission::LaterOn { queue: name, delay } => queue.later_on(&name, delay, job).await,
        Submission::PushOn { queue: name } => queue.push_on(&name, job).await,
        Submission::Later { delay } => queue.later(delay, job).await,
        Submission::Push => queue.push(job).await,
    }
}
