use command_bus::{Command, QueueHints};

#[derive(Command)]
struct Plain;

#[derive(Command)]
#[command(name = "orders::Ship", should_queue)]
struct Ship {
    order: u64,
}

#[derive(Command)]
#[command(queue = "mail", delay = 30, connection = "redis")]
struct SendMail;

#[derive(Command)]
struct Wrapped<T: Send + Sync + 'static> {
    inner: T,
}

fn main() {
    // 默认名称为 模块路径::类型名
    let _: &'static str = <Plain as Command>::NAME;

    assert_eq!(<Ship as Command>::NAME, "orders::Ship");
    assert!(Ship { order: 1 }.should_queue());
    let _ = Ship { order: 1 }.order;

    let hints: QueueHints = SendMail.queue_hints();
    assert_eq!(hints.queue(), Some("mail"));

    let w = Wrapped { inner: 1u8 };
    assert!(!w.should_queue());
    let _ = w.inner;
}
