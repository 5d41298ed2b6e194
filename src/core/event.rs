//! Event system

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use crate::error::{Result, ViewError};

/// Event priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    High = 0,
    #[default]
    Medium = 1,
    Low = 2,
}

/// Event trait
pub trait Event: Send + Sync + 'static {
    /// Name listeners subscribe to, e.g. `View.beforeRender`.
    fn event_name(&self) -> &'static str;

    fn priority(&self) -> Priority {
        Priority::default()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Implement [`Event`] for a type under a fixed event name
#[macro_export]
macro_rules! impl_event {
    ($t:ty => $name:expr) => {
        impl $crate::core::event::Event for $t {
            fn event_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

/// Event wrapper with metadata
pub struct EventWrapper {
    pub name: String,
    pub inner: Option<Arc<dyn Any + Send + Sync>>,
    pub priority: Priority,
    pub timestamp: u64,
    pub source: Option<String>,
}

impl fmt::Debug for EventWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWrapper")
            .field("name", &self.name)
            .field("has_payload", &self.inner.is_some())
            .field("priority", &self.priority)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .finish()
    }
}

impl EventWrapper {
    pub fn new<E: Event>(event: E) -> Self {
        let name = event.event_name().to_string();
        let priority = event.priority();
        Self {
            inner: Some(Arc::new(event)),
            priority,
            ..Self::named(name)
        }
    }

    /// An event that carries only its name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: None,
            priority: Priority::default(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64,
            source: None,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn downcast<E: Any>(&self) -> Option<&E> {
        self.inner.as_ref().and_then(|inner| inner.downcast_ref::<E>())
    }
}

/// Subscriber accepted by [`EventBus::register`]
pub trait EventListener: Send + Sync {
    /// Event names this listener wants to receive.
    fn implemented_events(&self) -> Vec<String>;

    fn handle(&self, event: &EventWrapper) -> Result<()>;

    fn name(&self) -> &str;
}

/// Handle returned by [`EventBus::register`], used to detach the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    events: Vec<String>,
    listener: Arc<dyn EventListener>,
}

type ListenerTable = Arc<RwLock<Vec<ListenerEntry>>>;

fn listeners_for(table: &ListenerTable, name: &str) -> Vec<Arc<dyn EventListener>> {
    table
        .read()
        .iter()
        .filter(|entry| entry.events.iter().any(|event| event == name))
        .map(|entry| Arc::clone(&entry.listener))
        .collect()
}

struct Queues {
    high: mpsc::UnboundedReceiver<EventWrapper>,
    medium: mpsc::UnboundedReceiver<EventWrapper>,
    low: mpsc::UnboundedReceiver<EventWrapper>,
}

impl Queues {
    /// Next event, highest priority first. `None` once every sender is gone.
    async fn next(&mut self) -> Option<EventWrapper> {
        tokio::select! {
            biased;
            Some(event) = self.high.recv() => Some(event),
            Some(event) = self.medium.recv() => Some(event),
            Some(event) = self.low.recv() => Some(event),
            else => None,
        }
    }

    fn try_next(&mut self) -> Option<EventWrapper> {
        self.high
            .try_recv()
            .or_else(|_| self.medium.try_recv())
            .or_else(|_| self.low.try_recv())
            .ok()
    }
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Queues>,
}

fn deliver(listeners: &ListenerTable, event_count: &AtomicU64, event: &EventWrapper) {
    event_count.fetch_add(1, Ordering::Relaxed);
    for listener in listeners_for(listeners, &event.name) {
        if let Err(e) = listener.handle(event) {
            warn!(listener = listener.name(), event = %event.name, error = %e, "queued event handler failed");
        }
    }
}

/// Event bus with synchronous dispatch and a queued, prioritised publish path
///
/// Queued events are only accepted between [`EventBus::start`] and
/// [`EventBus::stop`]. Stopping delivers whatever is still queued before the
/// dispatcher exits, and the bus can be started again afterwards.
pub struct EventBus {
    high_queue: mpsc::UnboundedSender<EventWrapper>,
    medium_queue: mpsc::UnboundedSender<EventWrapper>,
    low_queue: mpsc::UnboundedSender<EventWrapper>,
    listeners: ListenerTable,
    queues: Mutex<Option<Queues>>,
    worker: AsyncMutex<Option<Worker>>,
    running: AtomicBool,
    next_id: AtomicU64,
    event_count: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        let (high_tx, high) = mpsc::unbounded_channel();
        let (medium_tx, medium) = mpsc::unbounded_channel();
        let (low_tx, low) = mpsc::unbounded_channel();

        Self {
            high_queue: high_tx,
            medium_queue: medium_tx,
            low_queue: low_tx,
            listeners: Arc::new(RwLock::new(Vec::new())),
            queues: Mutex::new(Some(Queues { high, medium, low })),
            worker: AsyncMutex::new(None),
            running: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            event_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a listener to every event it implements.
    pub fn register<L: EventListener + 'static>(&self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let events = listener.implemented_events();
        debug!(listener = listener.name(), ?events, "registering event listener");
        self.listeners.write().push(ListenerEntry {
            id,
            events,
            listener: Arc::new(listener),
        });
        id
    }

    /// Detach a listener. Returns false when the id is unknown.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        before != listeners.len()
    }

    /// Deliver an event to its listeners immediately, in registration order.
    ///
    /// Stops at the first listener error. Returns the number of listeners called.
    pub fn dispatch(&self, event: EventWrapper) -> Result<usize> {
        let targets = listeners_for(&self.listeners, &event.name);
        self.event_count.fetch_add(1, Ordering::Relaxed);

        for listener in &targets {
            listener.handle(&event).map_err(|e| {
                ViewError::EventError(format!(
                    "{} failed on {}: {}",
                    listener.name(),
                    event.name,
                    e
                ))
            })?;
        }

        Ok(targets.len())
    }

    pub fn publish<E: Event>(&self, event: E) -> Result<()> {
        self.publish_wrapper(EventWrapper::new(event))
    }

    pub fn publish_with_priority<E: Event>(&self, event: E, priority: Priority) -> Result<()> {
        self.publish_wrapper(EventWrapper::new(event).with_priority(priority))
    }

    /// Queue an event for the background dispatcher started by [`EventBus::start`].
    pub fn publish_wrapper(&self, wrapper: EventWrapper) -> Result<()> {
        if !self.is_running() {
            return Err(ViewError::EventError(format!(
                "Event bus is not running, dropped {}",
                wrapper.name
            )));
        }

        let queue = match wrapper.priority {
            Priority::High => &self.high_queue,
            Priority::Medium => &self.medium_queue,
            Priority::Low => &self.low_queue,
        };

        queue
            .send(wrapper)
            .map_err(|e| ViewError::EventError(format!("Failed to publish event: {}", e)))
    }

    /// Spawn the dispatcher draining the priority queues.
    pub async fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Err(ViewError::RuntimeError("Event bus already running".to_string()));
        }

        let mut queues = self
            .queues
            .lock()
            .take()
            .ok_or_else(|| ViewError::RuntimeError("Event queues are no longer available".to_string()))?;

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let listeners = Arc::clone(&self.listeners);
        let event_count = Arc::clone(&self.event_count);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    event = queues.next() => match event {
                        Some(event) => deliver(&listeners, &event_count, &event),
                        None => break,
                    },
                }
            }

            while let Some(event) = queues.try_next() {
                deliver(&listeners, &event_count, &event);
            }
            queues
        });

        *worker = Some(Worker { shutdown, handle });
        self.running.store(true, Ordering::SeqCst);
        debug!("event dispatcher started");
        Ok(())
    }

    /// Stop accepting queued events, deliver the backlog and end the dispatcher.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.worker.lock().await;
        let Some(worker) = slot.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::SeqCst);

        // The dispatcher may already have exited on its own.
        let _ = worker.shutdown.send(());
        let queues = worker
            .handle
            .await
            .map_err(|e| ViewError::RuntimeError(format!("Event dispatcher failed: {}", e)))?;

        *self.queues.lock() = Some(queues);
        debug!("event dispatcher stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of listeners subscribed to `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|entry| entry.events.iter().any(|event| event == name))
            .count()
    }

    /// Number of registered listeners, whether or not they subscribe to anything.
    pub fn registered_listeners(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn processed_events(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener built from a closure
pub struct ClosureListener<F> {
    name: &'static str,
    events: Vec<String>,
    f: F,
}

impl<F> EventListener for ClosureListener<F>
where
    F: Fn(&EventWrapper) -> Result<()> + Send + Sync,
{
    fn implemented_events(&self) -> Vec<String> {
        self.events.clone()
    }

    fn handle(&self, event: &EventWrapper) -> Result<()> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn listener<F>(name: &'static str, events: &[&str], f: F) -> ClosureListener<F>
where
    F: Fn(&EventWrapper) -> Result<()> + Send + Sync,
{
    ClosureListener {
        name,
        events: events.iter().map(|event| event.to_string()).collect(),
        f,
    }
}
