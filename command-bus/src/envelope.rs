use crate::command::{AnyCommand, Command};
use crate::error::{BusError, BusResult};
use std::any::type_name;
use std::fmt;

/// 命令信封：在管道与处理器之间传递的、类型擦除的命令
///
/// 信封独占命令所有权；`open` 还原具体类型后命令交给唯一的消费者。
pub struct Envelope {
    command: Box<dyn AnyCommand>,
}

impl Envelope {
    pub fn new<C: Command>(command: C) -> Self {
        Self {
            command: Box::new(command),
        }
    }

    pub fn command_name(&self) -> &'static str {
        self.command.command_name()
    }

    /// 只读视图（观察用）
    pub fn command(&self) -> &dyn AnyCommand {
        &*self.command
    }

    pub fn is<C: Command>(&self) -> bool {
        self.command.as_any().is::<C>()
    }

    pub fn peek<C: Command>(&self) -> Option<&C> {
        self.command.as_any().downcast_ref::<C>()
    }

    /// 还原为具体命令类型
    pub fn open<C: Command>(self) -> BusResult<C> {
        let found = self.command.command_name();
        match self.command.into_any().downcast::<C>() {
            Ok(cmd) => Ok(*cmd),
            Err(_) => Err(BusError::TypeMismatch {
                expected: type_name::<C>(),
                found,
            }),
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("command", &self.command_name())
            .finish_non_exhaustive()
    }
}
