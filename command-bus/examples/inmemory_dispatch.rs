use async_trait::async_trait;
use command_bus::{
    BusError, BusResult, Command, CommandBus, CommandHandler, Container, Dispatcher,
    HandlerDescriptor, InMemoryContainer, Job, Marshal, MethodTable, Queue, Receipt, Reply,
    SelfHandling, queue_resolver,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Command, Marshal)]
#[command(name = "app::commands::CreateUser")]
struct CreateUser {
    name: String,
    #[marshal(default = "member")]
    role: String,
}

#[derive(Debug, Command)]
#[command(name = "app::commands::DeleteUser")]
struct DeleteUser {
    id: u32,
}

struct UserHandler;

#[async_trait]
impl CommandHandler<CreateUser> for UserHandler {
    type Output = String;

    async fn handle(&self, cmd: CreateUser) -> BusResult<String> {
        println!("CreateUser: name={} role={}", cmd.name, cmd.role);
        Ok(format!("user:{}", cmd.name))
    }
}

#[async_trait]
impl CommandHandler<DeleteUser> for UserHandler {
    type Output = ();

    async fn handle(&self, cmd: DeleteUser) -> BusResult<()> {
        println!("DeleteUser: id={}", cmd.id);
        Ok(())
    }
}

#[derive(Debug, Command)]
#[command(name = "app::commands::Ping", self_handling)]
struct Ping;

#[async_trait]
impl SelfHandling for Ping {
    async fn handle(&self, _container: &dyn Container) -> BusResult<Reply> {
        Ok(Reply::new("pong"))
    }
}

#[derive(Debug, Command)]
#[command(name = "app::commands::SendWelcome", should_queue, queue = "mail", delay = 5)]
struct SendWelcome {
    #[allow(dead_code)]
    to: String,
}

struct PrintQueue;

#[async_trait]
impl Queue for PrintQueue {
    async fn push(&self, job: Job) -> BusResult<Receipt> {
        println!("queued {} -> default", job.command_name());
        Ok(Receipt::acknowledged())
    }

    async fn push_on(&self, queue: &str, job: Job) -> BusResult<Receipt> {
        println!("queued {} -> {queue}", job.command_name());
        Ok(Receipt::acknowledged())
    }

    async fn later(&self, delay: Duration, job: Job) -> BusResult<Receipt> {
        println!("queued {} -> default (+{delay:?})", job.command_name());
        Ok(Receipt::acknowledged())
    }

    async fn later_on(&self, queue: &str, delay: Duration, job: Job) -> BusResult<Receipt> {
        println!("queued {} -> {queue} (+{delay:?})", job.command_name());
        Ok(Receipt::new("welcome-1"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let container = Arc::new(InMemoryContainer::new());
    let handler = Arc::new(UserHandler);
    container.singleton(
        "app::handlers::UserHandler",
        Arc::new(
            MethodTable::new("app::handlers::UserHandler")
                .on::<CreateUser, _>("register", handler.clone())
                .on::<DeleteUser, _>("remove", handler),
        ),
    );

    let queue: Arc<dyn Queue> = Arc::new(PrintQueue);
    let bus = Dispatcher::with_queue(container, queue_resolver(move |_| Some(queue.clone())));
    bus.maps([
        (
            CreateUser::NAME,
            HandlerDescriptor::new("app::handlers::UserHandler", "register"),
        ),
        (
            DeleteUser::NAME,
            "app::handlers::UserHandler@remove".parse()?,
        ),
    ]);

    let created = bus
        .dispatch_from_array::<CreateUser, _>(&json!({ "name": "Alice" }))
        .await?
        .into_value::<String>()?;
    println!("created {created}");

    bus.dispatch(DeleteUser { id: 42 }).await?;

    let pong = bus.dispatch_now(Ping).await?.downcast::<&'static str>()?;
    println!("ping -> {pong}");

    let receipt = bus
        .dispatch(SendWelcome {
            to: "alice@example.com".into(),
        })
        .await?
        .queued();
    println!("receipt {:?}", receipt.as_ref().and_then(|r| r.id()));

    // 未映射的命令 -> UnregisteredCommand
    #[derive(Debug, Command)]
    #[command(name = "app::commands::UpdateUser")]
    struct UpdateUser;

    if let Err(BusError::UnregisteredCommand(name)) = bus.dispatch(UpdateUser).await {
        println!("UpdateUser not registered: {name}");
    }

    Ok(())
}
