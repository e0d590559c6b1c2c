//! 命令总线统一错误定义
//!
//! 分发链路上的失败全部同步向调用方传播，本层不做重试或补偿。
//!
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    // --- 编组（marshal） ---
    #[error("unable to map parameter [{parameter}] to command [{command}]")]
    ParameterResolution {
        command: &'static str,
        parameter: String,
    },

    #[error("invalid parameter [{parameter}] for command [{command}]: {reason}")]
    InvalidParameter {
        command: &'static str,
        parameter: String,
        reason: String,
    },

    // --- 处理器解析 ---
    #[error("no handler registered for command [{0}]")]
    UnregisteredCommand(String),

    #[error("invalid handler descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("handler not bound: {0}")]
    HandlerNotBound(String),

    #[error("handler method not found: handler={handler}, method={method}")]
    MethodNotFound { handler: String, method: String },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 队列 ---
    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("queue: {0}")]
    Queue(String),

    // --- 处理器业务失败 ---
    #[error("handler: {0}")]
    Handler(#[from] anyhow::Error),

    // --- 配置 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;
