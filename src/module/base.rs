use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use super::specialization::{ModuleKind, Specialization};
use super::state::{ModuleState, ModuleStateMachine};
use super::task::{self, Control};
use crate::error::{FetchError, MediatorError, StrategyError};
use crate::messaging::{Command, Mediator, WeakMediator};
use crate::source::ValueSource;
use crate::strategy::{Strategy, StrategyOutput};

/// Callback invoked with (topic, value) when a subscribed value arrives
pub type NotificationCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// When and under which topic a module's background task publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSchedule {
    pub interval: Duration,
    pub topic: String,
}

impl Default for PublishSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            topic: "randomInt".to_string(),
        }
    }
}

/// An addressable unit that publishes and receives named values through the
/// mediator.
///
/// Modules are always handled as `Arc<Module>`; build them with
/// [`ModuleFactory`](super::ModuleFactory).
pub struct Module {
    id: String,
    kind: ModuleKind,
    state: Mutex<ModuleStateMachine>,
    notifier: RwLock<Option<NotificationCallback>>,
    mediator: WeakMediator,
    source: Arc<dyn ValueSource>,
    schedule: PublishSchedule,
    control_tx: Sender<Control>,
    control_rx: Receiver<Control>,
    /// Handle of the live background task, if any. Lock before `state`.
    task: Mutex<Option<JoinHandle<()>>>,
    specialization: Option<Mutex<Specialization>>,
    /// Set once a send found the mediator shut down
    queue_closed: AtomicBool,
    me: Weak<Module>,
}

impl Module {
    pub(crate) fn new(
        id: &str,
        kind: ModuleKind,
        payload: Option<Value>,
        mediator: WeakMediator,
        source: Arc<dyn ValueSource>,
        schedule: PublishSchedule,
    ) -> Arc<Self> {
        let (control_tx, control_rx) = unbounded();
        let specialization = kind
            .is_specialized()
            .then(|| Mutex::new(Specialization::new(payload.unwrap_or(Value::Null))));

        Arc::new_cyclic(|me| Self {
            id: id.to_string(),
            kind,
            state: Mutex::new(ModuleStateMachine::new()),
            notifier: RwLock::new(None),
            mediator,
            source,
            schedule,
            control_tx,
            control_rx,
            task: Mutex::new(None),
            specialization,
            queue_closed: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn state(&self) -> ModuleState {
        self.state.lock().state()
    }

    pub fn schedule(&self) -> &PublishSchedule {
        &self.schedule
    }

    /// Whether a background task is currently alive
    pub fn has_background_task(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Init → Running, starting the background task. No-op in any other state.
    pub fn transition_to_running(&self) {
        let mut task = self.task.lock();
        if let Err(e) = self.state.lock().start() {
            tracing::warn!("Module {} ignored transition to Running: {}", self.id, e);
            return;
        }
        tracing::info!("Module {} is transitioning to Running", self.id);
        *task = self.spawn_background();
    }

    /// Running → Shutdown, telling the background task to exit
    pub fn stop_background_process(&self) {
        if let Err(e) = self.state.lock().stop() {
            tracing::warn!("Module {} ignored stop request: {}", self.id, e);
            return;
        }
        let _ = self.control_tx.send(Control::Stop);
        tracing::info!("Module {} background process stopping", self.id);
    }

    /// Running → Error. The background task pauses at its next tick.
    pub fn mark_error(&self) {
        match self.state.lock().fail() {
            Ok(()) => tracing::warn!("Module {} put in Error state", self.id),
            Err(e) => tracing::warn!("Module {} ignored error request: {}", self.id, e),
        }
    }

    /// Error → Running, resuming periodic publishing
    pub fn resolve_error(&self) {
        let mut task = self.task.lock();
        if let Err(e) = self.state.lock().recover() {
            tracing::warn!("Module {} has no error to resolve: {}", self.id, e);
            return;
        }

        let alive = task.as_ref().is_some_and(|handle| !handle.is_finished());
        if alive {
            // Paused task, or one that has not noticed the error yet
            let _ = self.control_tx.send(Control::Resume);
            tracing::info!("Module {} error resolved, resuming background process", self.id);
        } else {
            *task = self.spawn_background();
            tracing::info!("Module {} error resolved, restarting background process", self.id);
        }
    }

    /// Called by the background task after a failed fetch
    pub(super) fn fail_from_task(&self, error: &FetchError) {
        let mut task = self.task.lock();
        match self.state.lock().fail() {
            Ok(()) => tracing::error!("Module {} encountered an error: {}", self.id, error),
            Err(e) => tracing::debug!(
                "Module {} fetch failed while not running ({}): {}",
                self.id,
                e,
                error
            ),
        }
        // The task is exiting; the slot only ever holds the live task
        *task = None;
    }

    pub(super) fn fetch_value(&self) -> Result<i64, FetchError> {
        self.source.fetch()
    }

    fn spawn_background(&self) -> Option<JoinHandle<()>> {
        match task::spawn(
            &self.id,
            self.me.clone(),
            self.control_rx.clone(),
            self.schedule.interval,
        ) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Module {} failed to start background process: {}", self.id, e);
                None
            }
        }
    }

    pub fn set_notification_callback<F>(&self, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        *self.notifier.write() = Some(Arc::new(callback));
    }

    pub fn clear_notification_callback(&self) {
        *self.notifier.write() = None;
    }

    /// Deliver a subscribed value to this module
    pub fn notify_subscriber(&self, topic: &str, value: &Value) {
        // Run the callback without holding the lock so it may replace itself
        let callback = self.notifier.read().clone();
        match callback {
            Some(callback) => callback(topic, value),
            None => tracing::info!(
                "Module {} received {} value update: {}",
                self.id,
                topic,
                value
            ),
        }
    }

    pub fn subscribe_to_topic(&self, topic: &str, publisher_id: &str) {
        if self.refuse_outbound("subscribe") {
            return;
        }
        self.dispatch(Command::subscribe(&self.id, publisher_id, topic), &self.id);
    }

    pub fn unsubscribe_from_topic(&self, topic: &str, publisher_id: &str) {
        if self.refuse_outbound("unsubscribe") {
            return;
        }
        self.dispatch(Command::unsubscribe(&self.id, publisher_id, topic), &self.id);
    }

    pub fn publish_to_topic(&self, topic: &str, value: impl Into<Value>) {
        if self.refuse_outbound("publish") {
            return;
        }
        self.dispatch(Command::publish(&self.id, topic, value.into()), &self.id);
    }

    fn refuse_outbound(&self, action: &str) -> bool {
        let errored = self.state().is_error();
        if errored {
            tracing::debug!("Module {} is in Error state, not sending {}", self.id, action);
        }
        errored
    }

    fn dispatch(&self, command: Command, target_id: &str) {
        let Some(mediator) = self.mediator() else {
            tracing::warn!(
                "Module {} has no mediator, dropping: {}",
                self.id,
                command.description()
            );
            return;
        };
        match mediator.send_command(command, target_id) {
            Ok(()) => {}
            Err(MediatorError::QueueClosed) => {
                if self.queue_closed.swap(true, Ordering::Relaxed) {
                    tracing::debug!("Module {} dropping command, queue closed", self.id);
                } else {
                    tracing::warn!("Module {} failed to send command: queue is closed", self.id);
                }
            }
            Err(e) => tracing::warn!("Module {} failed to send command: {}", self.id, e),
        }
    }

    pub fn mediator(&self) -> Option<Mediator> {
        self.mediator.upgrade()
    }

    /// Run the configured strategy over the payload
    pub fn execute(&self) -> Result<StrategyOutput, StrategyError> {
        let specialization = self.specialization()?;
        let (strategy, payload) = {
            let slot = specialization.lock();
            (slot.strategy.clone(), slot.payload.clone())
        };
        let strategy = strategy.ok_or_else(|| StrategyError::StrategyNotConfigured(self.id.clone()))?;
        strategy.execute(&payload)
    }

    pub fn set_strategy(&self, strategy: Arc<dyn Strategy>) -> Result<(), StrategyError> {
        let specialization = self.specialization()?;
        tracing::debug!("Module {} using strategy {}", self.id, strategy.identifier());
        specialization.lock().strategy = Some(strategy);
        Ok(())
    }

    /// Current payload of a specialized module
    pub fn payload(&self) -> Option<Value> {
        self.specialization
            .as_ref()
            .map(|slot| slot.lock().payload.clone())
    }

    pub fn set_payload(&self, payload: impl Into<Value>) -> Result<(), StrategyError> {
        self.specialization()?.lock().payload = payload.into();
        Ok(())
    }

    fn specialization(&self) -> Result<&Mutex<Specialization>, StrategyError> {
        self.specialization
            .as_ref()
            .ok_or_else(|| StrategyError::NotSpecialized(self.id.clone()))
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("source", &self.source.name())
            .finish()
    }
}
