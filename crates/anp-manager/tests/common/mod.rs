//! Shared fixtures for manager integration tests
//!
//! `MockTransport` plays the platform server: it answers requests from a
//! per-function script, records everything it was sent, and keeps the group
//! handler the manager registers so tests can push inbound messages.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;

use anp_core::{GroupHandler, TransportError};
use anp_manager::{
    AnpEvent, AnpManager, CallbackId, ManagerConfig, MessageTransport, PowerState,
    PowerStateSource,
};
use anp_protocol::header::MessageHeader;
use anp_protocol::records::StatusResponse;
use anp_protocol::{BdAddr, Message, MessageFunction, WireRecord, ANP_MESSAGE_GROUP};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Address ID the mock reports for the platform server
pub const SERVER_ADDRESS_ID: u32 = 0x51;

/// How long tests wait for something that should happen
pub const WAIT: Duration = Duration::from_secs(2);

/// How long tests wait to be sure something does not happen
pub const QUIET: Duration = Duration::from_millis(150);

pub const PEER: BdAddr = BdAddr([0x00, 0x1b, 0xdc, 0x07, 0x32, 0x8f]);

/// Route manager logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "anp_manager=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Side effect run while the mock is answering a request
pub type RequestHook = Box<dyn FnOnce(&MockTransport) + Send>;

/// Scripted answer to one request
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(i32),
    Timeout,
}

#[derive(Default)]
pub struct MockTransport {
    script: Mutex<HashMap<MessageFunction, VecDeque<Reply>>>,
    sent: Mutex<Vec<Message>>,
    handler: Mutex<Option<Arc<dyn GroupHandler>>>,
    refuse_handler: AtomicBool,
    hooks: Mutex<HashMap<MessageFunction, RequestHook>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the answer to the next `function` request; unscripted
    /// requests answer status 0
    pub fn script(&self, function: MessageFunction, reply: Reply) {
        self.script
            .lock()
            .entry(function)
            .or_default()
            .push_back(reply);
    }

    /// Run `hook` inside the next `function` request, before it is
    /// answered; the mock's own locks are released while it runs
    pub fn during(
        &self,
        function: MessageFunction,
        hook: impl FnOnce(&MockTransport) + Send + 'static,
    ) {
        self.hooks.lock().insert(function, Box::new(hook));
    }

    pub fn refuse_handler_registration(&self, refuse: bool) {
        self.refuse_handler.store(refuse, Ordering::SeqCst);
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Functions of every request sent so far, in order
    pub fn sent_functions(&self) -> Vec<MessageFunction> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| m.function())
            .collect()
    }

    pub fn count(&self, function: MessageFunction) -> usize {
        self.sent_functions()
            .into_iter()
            .filter(|f| *f == function)
            .count()
    }

    /// Decoded records of every `function` request sent so far
    pub fn sent_records<T: WireRecord>(&self, function: MessageFunction) -> Vec<T> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.function() == Some(function))
            .map(|m| m.decode().expect("request record"))
            .collect()
    }

    pub fn sent_messages(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Push an inbound ANP event through the registered handler
    pub fn deliver<T: WireRecord>(&self, function: MessageFunction, record: &T) {
        let message = Message::encode(
            SERVER_ADDRESS_ID,
            0,
            ANP_MESSAGE_GROUP,
            function.as_u32(),
            record,
        )
        .expect("encode event");
        self.deliver_message(message);
    }

    /// Push an inbound message with a hand-built payload
    pub fn deliver_raw(&self, function: u32, payload: &[u8]) {
        let header = MessageHeader::new(SERVER_ADDRESS_ID, 0, ANP_MESSAGE_GROUP, function, 0);
        self.deliver_message(Message::new(header, Bytes::copy_from_slice(payload)));
    }

    pub fn deliver_message(&self, message: Message) {
        let handler = self.handler.lock().clone();
        handler
            .expect("manager registered no group handler")
            .handle_message(message);
    }
}

impl MessageTransport for MockTransport {
    fn send_and_wait(&self, request: Message, _timeout: Duration) -> Result<Message, TransportError> {
        let reply = request
            .function()
            .and_then(|f| self.script.lock().get_mut(&f).and_then(VecDeque::pop_front))
            .unwrap_or(Reply::Status(0));
        self.sent.lock().push(request.clone());

        let hook = request
            .function()
            .and_then(|f| self.hooks.lock().remove(&f));
        if let Some(hook) = hook {
            hook(self);
        }

        match reply {
            Reply::Status(status) => Ok(request
                .response_to(&StatusResponse { status })
                .expect("encode response")),
            Reply::Timeout => Err(TransportError::Timeout),
        }
    }

    fn register_group_handler(
        &self,
        _group: u32,
        handler: Arc<dyn GroupHandler>,
    ) -> Result<(), TransportError> {
        if self.refuse_handler.load(Ordering::SeqCst) {
            return Err(TransportError::HandlerRegistration("refused".into()));
        }
        *self.handler.lock() = Some(handler);
        Ok(())
    }

    fn unregister_group_handler(&self, _group: u32) {
        self.handler.lock().take();
    }

    fn server_address_id(&self) -> u32 {
        SERVER_ADDRESS_ID
    }
}

/// Power state source with a settable answer
pub struct FixedPower(pub Mutex<PowerState>);

impl FixedPower {
    pub fn new(state: PowerState) -> Arc<Self> {
        Arc::new(Self(Mutex::new(state)))
    }
}

impl PowerStateSource for FixedPower {
    fn query_power_state(&self) -> PowerState {
        *self.0.lock()
    }
}

/// A manager over a fresh mock transport, not yet initialized
pub fn manager() -> (AnpManager, Arc<MockTransport>) {
    init_tracing();
    let transport = MockTransport::new();
    let manager = AnpManager::new(
        ManagerConfig::default(),
        transport.clone(),
        FixedPower::new(PowerState::On),
    );
    (manager, transport)
}

/// A running manager over a fresh mock transport
pub fn running_manager() -> (AnpManager, Arc<MockTransport>) {
    let (manager, transport) = manager();
    manager.initialize().expect("initialize");
    (manager, transport)
}

/// Receives the events a callback was handed
pub struct Recorder {
    rx: mpsc::Receiver<AnpEvent>,
}

impl Recorder {
    /// Build a callback and the recorder that observes it
    pub fn new() -> (impl Fn(&AnpEvent) + Send + Sync + 'static, Self) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback = move |event: &AnpEvent| {
            let _ = tx.lock().send(event.clone());
        };
        (callback, Self { rx })
    }

    pub fn next(&self) -> AnpEvent {
        self.rx.recv_timeout(WAIT).expect("expected an event")
    }

    pub fn assert_quiet(&self) {
        if let Ok(event) = self.rx.recv_timeout(QUIET) {
            panic!("Unexpected event: {:?}", event);
        }
    }
}

/// Server callback that holds the dispatch thread inside its first event
/// until released
pub struct Parked {
    entered: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl Parked {
    pub fn new() -> (impl Fn(&AnpEvent) + Send + Sync + 'static, Self) {
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        let parked_once = AtomicBool::new(false);
        let callback = move |_: &AnpEvent| {
            if parked_once.swap(true, Ordering::SeqCst) {
                return;
            }
            let _ = entered_tx.lock().send(());
            let _ = release_rx.lock().recv_timeout(WAIT * 5);
        };
        (callback, Self { entered, release })
    }

    /// Block until the dispatch thread is inside the callback
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(WAIT)
            .expect("callback never entered");
    }

    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

/// Register a client consumer, answering the remote registration with
/// `server_callback_id`
pub fn register_client(
    manager: &AnpManager,
    transport: &MockTransport,
    server_callback_id: i32,
) -> (CallbackId, Recorder) {
    transport.script(
        MessageFunction::RegisterAnpClientEvents,
        Reply::Status(server_callback_id),
    );
    let (callback, recorder) = Recorder::new();
    let id = manager
        .register_client_callback(callback)
        .expect("register client callback");
    (id, recorder)
}

/// Poll `condition` until it holds or `WAIT` elapses
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
