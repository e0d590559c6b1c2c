use crate::error::{BusError, BusResult};
use crate::queue::Receipt;
use std::any::{Any, type_name};
use std::fmt;

/// 处理结果（类型擦除）
///
/// 处理器返回任意值，调用端通过 [`Reply::downcast`] 还原。
pub struct Reply {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Reply {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// 无返回值的处理结果
    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: Any>(self) -> BusResult<T> {
        let found = self.type_name;
        match self.value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(_) => Err(BusError::TypeMismatch {
                expected: type_name::<T>(),
                found,
            }),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// 一次分发的结果
/// - `Handled`：同步执行，携带处理器返回值；
/// - `Queued`：已投递到队列，携带队列回执（而非业务结果）。
#[derive(Debug)]
pub enum Dispatched {
    Handled(Reply),
    Queued(Receipt),
}

impl Dispatched {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    pub fn handled(self) -> Option<Reply> {
        match self {
            Self::Handled(reply) => Some(reply),
            Self::Queued(_) => None,
        }
    }

    pub fn queued(self) -> Option<Receipt> {
        match self {
            Self::Queued(receipt) => Some(receipt),
            Self::Handled(_) => None,
        }
    }

    /// 取出同步处理结果并还原为 `T`；入队时返回类型不匹配错误
    pub fn into_value<T: Any>(self) -> BusResult<T> {
        match self {
            Self::Handled(reply) => reply.downcast(),
            Self::Queued(_) => Err(BusError::TypeMismatch {
                expected: type_name::<T>(),
                found: type_name::<Receipt>(),
            }),
        }
    }
}
