//! 命令分发总线
//!
//! 命令（Command）经由分发器路由到唯一的消费者：
//! - 标记为应当入队的命令投递到队列；
//! - 其余命令经过分发前管道后，交给自身（自处理命令）或解析出的处理器执行。
//!
//! 处理器解析优先级：自处理 → 显式映射 → 映射函数 → `UnregisteredCommand`。
pub mod bus;
pub mod command;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod marshal;
pub mod pipeline;
pub mod queue;
pub mod reply;
pub mod resolver;

pub use command::{AnyCommand, Command, CustomQueueing, QueueHints, SelfHandling};
pub use bus::CommandBus;
pub use config::{DispatcherConfig, SimpleMapping};
pub use container::{Container, InMemoryContainer};
pub use descriptor::HandlerDescriptor;
pub use dispatcher::{Dispatcher, ResolvedHandler};
pub use envelope::Envelope;
pub use error::{BusError, BusResult};
pub use handler::{CommandHandler, Handler, MethodTable};
pub use marshal::{Arguments, Marshal, Parameter, ValueSource};
pub use pipeline::{Next, Pipe};
pub use queue::{Job, Queue, QueueResolver, Receipt, Submission, queue_resolver};
pub use reply::{Dispatched, Reply};
pub use resolver::{Mapper, simple_mapper};

#[cfg(feature = "derive")]
pub use command_bus_macros::{Command, Marshal};

/// 分发相关日志的 target
pub(crate) const DISPATCH_TARGET: &str = "command_bus::dispatch";

// 允许在本 crate 内部通过 ::command_bus 进行自引用，
// 以便派生宏在本 crate 的单元测试中也能解析到 ::command_bus 路径。
extern crate self as command_bus;
