use async_trait::async_trait;
use command_bus::{
    BusError, BusResult, Command, CommandBus, CommandHandler, Container, CustomQueueing,
    Dispatched, Dispatcher, DispatcherConfig, Envelope, Handler, HandlerDescriptor,
    InMemoryContainer, Job, Marshal, MethodTable, Next, Pipe, Queue, QueueHints, Receipt, Reply,
    ResolvedHandler, SelfHandling, SimpleMapping, queue_resolver, simple_mapper,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---- 测试替身 ----

#[derive(Debug, Clone, PartialEq)]
struct Pushed {
    method: &'static str,
    queue: Option<String>,
    delay: Option<Duration>,
    command: &'static str,
}

#[derive(Default)]
struct RecordingQueue {
    pushed: Mutex<Vec<Pushed>>,
}

impl RecordingQueue {
    fn record(
        &self,
        method: &'static str,
        queue: Option<&str>,
        delay: Option<Duration>,
        job: &Job,
    ) -> BusResult<Receipt> {
        let mut pushed = self.pushed.lock().unwrap();
        pushed.push(Pushed {
            method,
            queue: queue.map(str::to_owned),
            delay,
            command: job.command_name(),
        });
        Ok(Receipt::new(format!("job-{}", pushed.len())))
    }

    fn pushed(&self) -> Vec<Pushed> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Queue for RecordingQueue {
    async fn push(&self, job: Job) -> BusResult<Receipt> {
        self.record("push", None, None, &job)
    }

    async fn push_on(&self, queue: &str, job: Job) -> BusResult<Receipt> {
        self.record("push_on", Some(queue), None, &job)
    }

    async fn later(&self, delay: Duration, job: Job) -> BusResult<Receipt> {
        self.record("later", None, Some(delay), &job)
    }

    async fn later_on(&self, queue: &str, delay: Duration, job: Job) -> BusResult<Receipt> {
        self.record("later_on", Some(queue), Some(delay), &job)
    }
}

fn queued_dispatcher(container: Arc<InMemoryContainer>, queue: Arc<RecordingQueue>) -> Dispatcher {
    Dispatcher::with_queue(
        container,
        queue_resolver(move |_connection| Some(queue.clone() as Arc<dyn Queue>)),
    )
}

// ---- 命令与处理器 ----

struct BasicCommand;

impl Command for BasicCommand {
    const NAME: &'static str = "app::commands::BasicCommand";
}

struct BasicHandler;

#[async_trait]
impl CommandHandler<BasicCommand> for BasicHandler {
    type Output = &'static str;

    async fn handle(&self, _cmd: BasicCommand) -> BusResult<Self::Output> {
        Ok("foo")
    }
}

fn basic_handler_table() -> MethodTable {
    MethodTable::new("app::handlers::BasicCommandHandler")
        .on::<BasicCommand, _>("handle", Arc::new(BasicHandler))
}

struct QueuedCommand;

impl Command for QueuedCommand {
    const NAME: &'static str = "app::commands::QueuedCommand";

    fn should_queue(&self) -> bool {
        true
    }
}

struct DelayedOnFoo;

impl Command for DelayedOnFoo {
    const NAME: &'static str = "app::commands::DelayedOnFoo";

    fn should_queue(&self) -> bool {
        true
    }

    fn queue_hints(&self) -> QueueHints {
        QueueHints::builder()
            .queue("foo")
            .delay(Duration::from_secs(10))
            .build()
    }
}

struct CustomQueued;

impl Command for CustomQueued {
    const NAME: &'static str = "app::commands::CustomQueued";

    fn should_queue(&self) -> bool {
        true
    }

    fn as_custom_queueing(&self) -> Option<&dyn CustomQueueing> {
        Some(self)
    }
}

#[async_trait]
impl CustomQueueing for CustomQueued {
    async fn queue(&self, queue: &dyn Queue, job: Job) -> BusResult<Receipt> {
        queue.push_on("custom", job).await
    }
}

struct Standalone {
    value: u32,
}

impl Command for Standalone {
    const NAME: &'static str = "app::commands::Standalone";

    fn as_self_handling(&self) -> Option<&dyn SelfHandling> {
        Some(self)
    }
}

#[async_trait]
impl SelfHandling for Standalone {
    async fn handle(&self, container: &dyn Container) -> BusResult<Reply> {
        let factor = container.get::<u32>().map(|f| *f).unwrap_or(1);
        Ok(Reply::new(self.value * factor))
    }
}

#[derive(Debug, PartialEq, Command, Marshal)]
#[command(name = "app::commands::RegisterUser")]
struct RegisterUser {
    #[marshal(rename = "firstName")]
    first_name: String,
    #[marshal(rename = "lastName")]
    last_name: String,
    #[marshal(default = "member")]
    role: String,
}

fn register_user_table() -> MethodTable {
    MethodTable::new("app::handlers::RegisterUserHandler").on_fn(
        "handle",
        |cmd: RegisterUser| async move {
            Ok(format!("{} {} ({})", cmd.first_name, cmd.last_name, cmd.role))
        },
    )
}

// ---- 同步分发 ----

#[tokio::test]
async fn basic_dispatch_through_mapper() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);

    let bus = Dispatcher::new(container);
    bus.map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    for _ in 0..2 {
        let out = bus.dispatch(BasicCommand).await.unwrap();
        assert_eq!(out.into_value::<&'static str>().unwrap(), "foo");
    }
}

#[tokio::test]
async fn explicit_mapping_selects_method() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("Basic", || {
        MethodTable::new("Basic")
            .on_fn("run", |_: BasicCommand| async { Ok("ran") })
            .on::<BasicCommand, _>("handle", Arc::new(BasicHandler))
    });

    let bus = Dispatcher::new(container);
    bus.map::<BasicCommand>("Basic@run".parse().unwrap());

    assert_eq!(bus.handler_type(&BasicCommand).unwrap(), "Basic");
    assert_eq!(bus.handler_method(&BasicCommand).unwrap(), "run");

    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "ran");
}

#[tokio::test]
async fn standalone_handler_mapping_defaults_to_handle() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("StandAloneHandler", || {
        MethodTable::new("StandAloneHandler").on::<BasicCommand, _>("handle", Arc::new(BasicHandler))
    });

    let bus = Dispatcher::new(container);
    bus.maps([(BasicCommand::NAME, "StandAloneHandler".parse().unwrap())]);

    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "foo");
}

#[tokio::test]
async fn unregistered_command_fails_without_side_effects() {
    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(Arc::new(InMemoryContainer::new()), queue.clone());

    match bus.dispatch(BasicCommand).await {
        Err(BusError::UnregisteredCommand(name)) => assert_eq!(name, BasicCommand::NAME),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(queue.pushed().is_empty());
}

#[tokio::test]
async fn missing_handler_binding_is_reported() {
    let bus = Dispatcher::new(Arc::new(InMemoryContainer::new()));
    bus.map::<BasicCommand>(HandlerDescriptor::handle("Nowhere"));

    assert!(matches!(
        bus.dispatch_now(BasicCommand).await,
        Err(BusError::HandlerNotBound(name)) if name == "Nowhere"
    ));
}

#[tokio::test]
async fn unknown_method_is_reported() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);

    let bus = Dispatcher::new(container);
    bus.map::<BasicCommand>(HandlerDescriptor::new(
        "app::handlers::BasicCommandHandler",
        "missing",
    ));

    assert!(matches!(
        bus.dispatch_now(BasicCommand).await,
        Err(BusError::MethodNotFound { .. })
    ));
}

#[tokio::test]
async fn handler_errors_propagate() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("Failing", || {
        MethodTable::new("Failing").on_fn("handle", |_: BasicCommand| async {
            Err::<(), _>(BusError::Handler(anyhow::anyhow!("boom")))
        })
    });

    let bus = Dispatcher::new(container);
    bus.map::<BasicCommand>(HandlerDescriptor::handle("Failing"));

    match bus.dispatch(BasicCommand).await {
        Err(BusError::Handler(e)) => assert_eq!(e.to_string(), "boom"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn self_handling_command_ignores_mappings_and_uses_container() {
    let container = Arc::new(InMemoryContainer::new());
    container.provide(3u32);

    let bus = Dispatcher::new(container);
    bus.map::<Standalone>(HandlerDescriptor::handle("Elsewhere"));
    bus.map_using(|_| HandlerDescriptor::handle("AlsoElsewhere"));

    let out = bus.dispatch(Standalone { value: 7 }).await.unwrap();
    assert_eq!(out.into_value::<u32>().unwrap(), 21);

    match bus.resolve_handler(&Standalone { value: 1 }).unwrap() {
        ResolvedHandler::Command(cmd) => assert_eq!(cmd.value, 1),
        ResolvedHandler::Handler(_) => panic!("self-handling command resolved to a handler"),
    }
}

#[tokio::test]
async fn resolve_handler_constructs_from_container() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);

    let bus = Dispatcher::new(container);
    bus.maps([(
        BasicCommand::NAME,
        HandlerDescriptor::handle("app::handlers::BasicCommandHandler"),
    )]);

    match bus.resolve_handler(&BasicCommand).unwrap() {
        ResolvedHandler::Handler(h) => {
            assert_eq!(h.handler_name(), "app::handlers::BasicCommandHandler")
        }
        ResolvedHandler::Command(_) => panic!("expected a handler"),
    }
    assert_eq!(bus.registered_commands(), vec![BasicCommand::NAME.to_owned()]);
}

#[tokio::test]
async fn on_resolved_hook_runs_once_before_invocation() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);

    let bus = Dispatcher::new(container);
    bus.map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let seen = Mutex::new(Vec::new());
    let out = bus
        .dispatch_with(BasicCommand, |handler: &dyn Handler| {
            seen.lock().unwrap().push(handler.handler_name().to_owned());
        })
        .await
        .unwrap();

    assert_eq!(out.into_value::<&'static str>().unwrap(), "foo");
    assert_eq!(
        seen.into_inner().unwrap(),
        vec!["app::handlers::BasicCommandHandler".to_owned()]
    );
}

#[tokio::test]
async fn on_resolved_hook_is_skipped_for_self_handling_commands() {
    let container = Arc::new(InMemoryContainer::new());
    container.provide(2u32);

    let bus = Dispatcher::new(container);
    let hook_calls = AtomicUsize::new(0);
    let out = bus
        .dispatch_with(Standalone { value: 5 }, |_| {
            hook_calls.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(out.into_value::<u32>().unwrap(), 10);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

struct Counted {
    runs: Arc<AtomicUsize>,
}

impl Command for Counted {
    const NAME: &'static str = "app::commands::Counted";

    fn as_self_handling(&self) -> Option<&dyn SelfHandling> {
        Some(self)
    }
}

#[async_trait]
impl SelfHandling for Counted {
    async fn handle(&self, _container: &dyn Container) -> BusResult<Reply> {
        Ok(Reply::new(self.runs.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

#[tokio::test]
async fn self_handling_command_runs_once_per_dispatch() {
    let runs = Arc::new(AtomicUsize::new(0));
    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(Arc::new(InMemoryContainer::new()), queue.clone());
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.pipe_through([Arc::new(Recording {
        label: "outer",
        log: log.clone(),
    }) as Arc<dyn Pipe>]);

    let out = bus
        .dispatch(Counted { runs: runs.clone() })
        .await
        .unwrap();
    assert_eq!(out.into_value::<usize>().unwrap(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    bus.dispatch_now(Counted { runs: runs.clone() }).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(log.lock().unwrap().len(), 2);
    assert!(queue.pushed().is_empty());
}

// ---- 入队 ----

#[tokio::test]
async fn should_queue_command_is_pushed() {
    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(Arc::new(InMemoryContainer::new()), queue.clone());

    let out = bus.dispatch(QueuedCommand).await.unwrap();
    assert!(out.is_queued());
    assert_eq!(out.queued().unwrap().id(), Some("job-1"));
    assert_eq!(
        queue.pushed(),
        vec![Pushed {
            method: "push",
            queue: None,
            delay: None,
            command: QueuedCommand::NAME,
        }]
    );
}

#[tokio::test]
async fn queue_and_delay_hints_use_later_on() {
    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(Arc::new(InMemoryContainer::new()), queue.clone());

    bus.dispatch(DelayedOnFoo).await.unwrap();
    assert_eq!(
        queue.pushed(),
        vec![Pushed {
            method: "later_on",
            queue: Some("foo".into()),
            delay: Some(Duration::from_secs(10)),
            command: DelayedOnFoo::NAME,
        }]
    );
}

#[tokio::test]
async fn custom_queueing_takes_over_submission() {
    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(Arc::new(InMemoryContainer::new()), queue.clone());

    bus.dispatch(CustomQueued).await.unwrap();
    let pushed = queue.pushed();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].method, "push_on");
    assert_eq!(pushed[0].queue.as_deref(), Some("custom"));
}

#[tokio::test]
async fn dispatch_now_never_queues() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("Sync", || {
        MethodTable::new("Sync").on_fn("handle", |_: QueuedCommand| async { Ok("sync") })
    });

    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(container, queue.clone());
    bus.map::<QueuedCommand>(HandlerDescriptor::handle("Sync"));

    let reply = bus.dispatch_now(QueuedCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "sync");
    assert!(queue.pushed().is_empty());
}

#[tokio::test]
async fn queued_handler_type_routes_command_to_queue() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);
    container.mark_queued("app::handlers::BasicCommandHandler");

    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(container, queue.clone());
    bus.pipe_through([]).map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let hook_calls = AtomicUsize::new(0);
    let out = bus
        .dispatch_with(BasicCommand, |_| {
            hook_calls.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert!(out.is_queued());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.pushed()[0].command, BasicCommand::NAME);
}

#[tokio::test]
async fn should_queue_without_resolver_runs_synchronously() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("Sync", || {
        MethodTable::new("Sync").on_fn("handle", |_: QueuedCommand| async { Ok(1u8) })
    });

    let bus = Dispatcher::new(container);
    bus.map::<QueuedCommand>(HandlerDescriptor::handle("Sync"));

    assert!(bus.should_queue(&QueuedCommand).unwrap());
    let out = bus.dispatch(QueuedCommand).await.unwrap();
    assert_eq!(out.into_value::<u8>().unwrap(), 1);

    assert!(matches!(
        bus.dispatch_to_queue(QueuedCommand).await,
        Err(BusError::QueueUnavailable(_))
    ));
}

#[tokio::test]
async fn resolver_without_queue_is_unavailable() {
    let connections = Arc::new(Mutex::new(Vec::new()));
    let seen = connections.clone();
    let bus = Dispatcher::with_queue(
        Arc::new(InMemoryContainer::new()),
        queue_resolver(move |connection| {
            seen.lock().unwrap().push(connection.map(str::to_owned));
            None
        }),
    );

    assert!(matches!(
        bus.dispatch(QueuedCommand).await,
        Err(BusError::QueueUnavailable(_))
    ));
    assert_eq!(*connections.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn mapper_runs_once_per_dispatch_with_queue_configured() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);

    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(container, queue.clone());
    let mapped = Arc::new(AtomicUsize::new(0));
    let counter = mapped.clone();
    bus.map_using(move |command| {
        counter.fetch_add(1, Ordering::SeqCst);
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let out = bus.dispatch(BasicCommand).await.unwrap();
    assert_eq!(out.into_value::<&'static str>().unwrap(), "foo");
    assert_eq!(mapped.load(Ordering::SeqCst), 1);

    let hook_calls = AtomicUsize::new(0);
    bus.dispatch_with(BasicCommand, |_| {
        hook_calls.fetch_add(1, Ordering::SeqCst);
    })
    .await
    .unwrap();
    assert_eq!(mapped.load(Ordering::SeqCst), 2);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert!(queue.pushed().is_empty());
}

// ---- 管道 ----

struct Recording {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Pipe for Recording {
    async fn handle(&self, envelope: Envelope, next: Next<'_>) -> BusResult<Reply> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.label, envelope.command_name()));
        next.run(envelope).await
    }
}

struct ShortCircuit;

#[async_trait]
impl Pipe for ShortCircuit {
    async fn handle(&self, envelope: Envelope, next: Next<'_>) -> BusResult<Reply> {
        if envelope.is::<BasicCommand>() {
            return Ok(Reply::new("blocked"));
        }
        next.run(envelope).await
    }
}

#[tokio::test]
async fn pipes_run_in_order_and_can_short_circuit() {
    let container = Arc::new(InMemoryContainer::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    container.bind("app::handlers::BasicCommandHandler", move || {
        let counted = counted.clone();
        MethodTable::new("app::handlers::BasicCommandHandler").on_fn(
            "handle",
            move |_: BasicCommand| {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok("foo")
                }
            },
        )
    });

    let bus = Dispatcher::new(container);
    bus.map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let log = Arc::new(Mutex::new(Vec::new()));
    bus.pipe_through([
        Arc::new(Recording {
            label: "first",
            log: log.clone(),
        }) as Arc<dyn Pipe>,
        Arc::new(Recording {
            label: "second",
            log: log.clone(),
        }),
    ]);

    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "foo");
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            format!("first:{}", BasicCommand::NAME),
            format!("second:{}", BasicCommand::NAME),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    bus.pipe_through([Arc::new(ShortCircuit) as Arc<dyn Pipe>]);
    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "blocked");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

struct Renamed;

impl Command for Renamed {
    const NAME: &'static str = "app::commands::Renamed";
}

struct Rewrite;

#[async_trait]
impl Pipe for Rewrite {
    async fn handle(&self, envelope: Envelope, next: Next<'_>) -> BusResult<Reply> {
        if envelope.is::<BasicCommand>() {
            return next.run(Envelope::new(Renamed)).await;
        }
        next.run(envelope).await
    }
}

#[tokio::test]
async fn pipe_may_replace_the_command_before_the_handler() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("Shared", || {
        MethodTable::new("Shared")
            .on_fn("handle", |_: BasicCommand| async { Ok("basic") })
            .on_fn("renamed", |_: Renamed| async { Ok("renamed") })
    });

    let queue = Arc::new(RecordingQueue::default());
    let bus = queued_dispatcher(container, queue.clone());
    bus.map::<BasicCommand>(HandlerDescriptor::handle("Shared"));
    bus.map::<Renamed>(HandlerDescriptor::new("Shared", "renamed"));
    bus.pipe_through([Arc::new(Rewrite) as Arc<dyn Pipe>]);

    let out = bus.dispatch(BasicCommand).await.unwrap();
    assert_eq!(out.into_value::<&'static str>().unwrap(), "renamed");

    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "renamed");
    assert!(queue.pushed().is_empty());
}

// ---- 编组后分发 ----

#[tokio::test]
async fn dispatch_from_array_marshals_then_dispatches() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::RegisterUserHandler", register_user_table);

    let bus = Dispatcher::new(container);
    bus.map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let out = bus
        .dispatch_from_array::<RegisterUser, _>(&json!({ "firstName": "taylor", "lastName": "otwell" }))
        .await
        .unwrap();
    assert_eq!(out.into_value::<String>().unwrap(), "taylor otwell (member)");
}

#[tokio::test]
async fn dispatch_from_prefers_extras_over_source() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::RegisterUserHandler", register_user_table);

    let bus = Dispatcher::new(container);
    bus.map_using(|command| {
        HandlerDescriptor::simple_mapping(command, "app::commands", "app::handlers")
    });

    let source = json!({ "firstName": "taylor", "lastName": "otwell", "role": null });
    let extras = json!({ "role": "admin" });
    let out = bus
        .dispatch_from::<RegisterUser, _, _>(&source, &extras)
        .await
        .unwrap();
    assert_eq!(out.into_value::<String>().unwrap(), "taylor otwell (admin)");

    let err = bus
        .dispatch_from::<RegisterUser, _, _>(&json!({ "firstName": "taylor" }), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BusError::ParameterResolution { parameter, .. } if parameter == "lastName"
    ));
}

// ---- 配置 ----

#[tokio::test]
async fn from_config_applies_mappings_and_simple_mapper() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("app::handlers::BasicCommandHandler", basic_handler_table);
    container.bind("app::handlers::RegisterUserHandler", register_user_table);

    let config = DispatcherConfig::builder()
        .mappings(
            [(
                RegisterUser::NAME.to_owned(),
                HandlerDescriptor::handle("app::handlers::RegisterUserHandler"),
            )]
            .into(),
        )
        .simple_mapping(SimpleMapping::new("app::commands", "app::handlers"))
        .cache_mapper_results(true)
        .build();

    let bus = Dispatcher::from_config(container, None, &config);
    assert!(!bus.has_queue_resolver());
    assert_eq!(bus.registered_commands(), vec![RegisterUser::NAME.to_owned()]);

    let out = bus.dispatch(BasicCommand).await.unwrap();
    assert_eq!(out.into_value::<&'static str>().unwrap(), "foo");

    bus.clear_mapper();
    assert!(matches!(
        bus.dispatch(BasicCommand).await,
        Err(BusError::UnregisteredCommand(_))
    ));

    let out = bus
        .dispatch_from_array::<RegisterUser, _>(&json!({ "firstName": "a", "lastName": "b" }))
        .await
        .unwrap();
    assert!(matches!(out, Dispatched::Handled(_)));
}

#[tokio::test]
async fn mapper_is_replaceable() {
    let container = Arc::new(InMemoryContainer::new());
    container.bind("v2::BasicCommandHandler", || {
        MethodTable::new("v2::BasicCommandHandler").on_fn("handle", |_: BasicCommand| async { Ok("v2") })
    });

    let config = DispatcherConfig::from_json_str(
        r#"{ "simple_mapping": { "command_prefix": "app::commands", "handler_prefix": "v1" },
             "cache_mapper_results": true }"#,
    )
    .unwrap();
    let bus = Dispatcher::from_config(container, None, &config);
    assert_eq!(bus.handler_type(&BasicCommand).unwrap(), "v1::BasicCommandHandler");

    let mapper = simple_mapper("app::commands", "v2");
    bus.map_using(move |command| mapper(command));
    assert_eq!(bus.handler_type(&BasicCommand).unwrap(), "v2::BasicCommandHandler");

    let reply = bus.dispatch_now(BasicCommand).await.unwrap();
    assert_eq!(reply.downcast::<&'static str>().unwrap(), "v2");
}
