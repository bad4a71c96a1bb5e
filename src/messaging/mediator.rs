/// Mediator
///
/// Owns the module registry, the subscription table and the worker pool.
/// `Mediator` is a cheap handle; clones share the same broker. Modules hold a
/// `WeakMediator` so the registry never keeps its own broker alive.
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use super::commands::Command;
use super::executor::{spawn_worker, QueuedCommand};
use super::subscriptions::{SubscriptionKey, SubscriptionTable, UnsubscribeOutcome};
use crate::config::BrokerConfig;
use crate::error::MediatorError;
use crate::module::Module;

pub const DEFAULT_WORKER_COUNT: usize = 5;

struct Inner {
    modules: Mutex<HashMap<String, Arc<Module>>>,
    subscriptions: SubscriptionTable,
    /// `None` once shut down
    queue: Mutex<Option<Sender<QueuedCommand>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

#[derive(Clone)]
pub struct Mediator {
    inner: Arc<Inner>,
}

/// Non-owning handle to a mediator
#[derive(Clone, Default)]
pub struct WeakMediator {
    inner: Weak<Inner>,
}

impl WeakMediator {
    pub fn upgrade(&self) -> Option<Mediator> {
        self.inner.upgrade().map(|inner| Mediator { inner })
    }
}

impl Mediator {
    /// Create a mediator and start `worker_count` workers (at least one)
    pub fn new(worker_count: usize) -> Self {
        let worker_count = if worker_count == 0 {
            tracing::warn!("Worker count of 0 requested, using 1");
            1
        } else {
            worker_count
        };

        // Zero capacity: a send completes only when a worker takes the command
        let (tx, rx) = bounded::<QueuedCommand>(0);

        let mediator = Self {
            inner: Arc::new(Inner {
                modules: Mutex::new(HashMap::new()),
                subscriptions: SubscriptionTable::new(),
                queue: Mutex::new(Some(tx)),
                workers: Mutex::new(Vec::with_capacity(worker_count)),
                worker_count,
            }),
        };

        let mut workers = mediator.inner.workers.lock();
        for index in 0..worker_count {
            match spawn_worker(index, rx.clone(), mediator.downgrade()) {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!("Failed to start command worker {}: {}", index, e),
            }
        }
        tracing::info!("Mediator started with {} workers", workers.len());
        drop(workers);

        mediator
    }

    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(config.worker_count)
    }

    pub fn downgrade(&self) -> WeakMediator {
        WeakMediator {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.inner.worker_count
    }

    /// Store a module under its id. Returns the module previously registered
    /// under that id, which is replaced.
    pub fn register_module(&self, module: Arc<Module>) -> Option<Arc<Module>> {
        let id = module.id().to_string();
        let kind = module.kind();
        let previous = self.inner.modules.lock().insert(id.clone(), module);

        if previous.is_some() {
            tracing::warn!("Module {} re-registered, previous instance replaced", id);
        } else {
            tracing::info!("Registered {} module {}", kind, id);
        }
        previous
    }

    /// Remove a module from the registry. Subscriptions naming it are kept.
    pub fn unregister_module(&self, id: &str) -> Result<Arc<Module>, MediatorError> {
        let removed = self.inner.modules.lock().remove(id);
        match removed {
            Some(module) => {
                tracing::info!("Unregistered module {}", id);
                Ok(module)
            }
            None => Err(MediatorError::ModuleNotFound(id.to_string())),
        }
    }

    pub fn get_module(&self, id: &str) -> Option<Arc<Module>> {
        self.inner.modules.lock().get(id).cloned()
    }

    /// Ids of all registered modules, sorted
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.modules.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Subscribe to any value. The publisher doesn't have to exist yet.
    pub fn subscribe(&self, subscriber_id: &str, publisher_id: &str, topic: &str) {
        let added = self
            .inner
            .subscriptions
            .subscribe(subscriber_id, SubscriptionKey::new(publisher_id, topic));
        if added {
            tracing::debug!(
                "Subscriber {} subscribed to {}:{}",
                subscriber_id,
                publisher_id,
                topic
            );
        }
    }

    pub fn unsubscribe(
        &self,
        subscriber_id: &str,
        publisher_id: &str,
        topic: &str,
    ) -> UnsubscribeOutcome {
        let key = SubscriptionKey::new(publisher_id, topic);
        let outcome = self.inner.subscriptions.unsubscribe(subscriber_id, &key);
        match outcome {
            UnsubscribeOutcome::Removed => {
                tracing::info!("Subscriber {} unsubscribed from {}", subscriber_id, key)
            }
            UnsubscribeOutcome::NotSubscribed => {
                tracing::warn!("Subscriber {} is not subscribed to {}", subscriber_id, key)
            }
            UnsubscribeOutcome::NoSubscribers => {
                tracing::warn!("No subscribers found for {}", key)
            }
        }
        outcome
    }

    /// Deliver `value` to every current subscriber of (publisher, topic).
    ///
    /// Subscribers that are not registered or are in Error are skipped.
    /// Returns the number of modules the value was delivered to.
    pub fn notify_subscribers(&self, publisher_id: &str, topic: &str, value: &Value) -> usize {
        let key = SubscriptionKey::new(publisher_id, topic);
        // Snapshot first: callbacks run without any mediator lock held
        let subscribers = self.inner.subscriptions.subscribers(&key);

        let mut delivered = 0;
        for subscriber_id in subscribers {
            let Some(module) = self.get_module(&subscriber_id) else {
                tracing::debug!("Skipping unregistered subscriber {} of {}", subscriber_id, key);
                continue;
            };
            if module.state().is_error() {
                tracing::debug!("Skipping errored subscriber {} of {}", subscriber_id, key);
                continue;
            }
            module.notify_subscriber(topic, value);
            delivered += 1;
        }
        delivered
    }

    /// Sorted subscribers of (publisher, topic)
    pub fn subscribers(&self, publisher_id: &str, topic: &str) -> Vec<String> {
        self.inner
            .subscriptions
            .subscribers(&SubscriptionKey::new(publisher_id, topic))
    }

    pub fn is_subscribed(&self, subscriber_id: &str, publisher_id: &str, topic: &str) -> bool {
        self.inner
            .subscriptions
            .is_subscribed(subscriber_id, &SubscriptionKey::new(publisher_id, topic))
    }

    /// Number of (subscriber, publisher, topic) entries
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Log the whole subscription table
    pub fn log_subscriptions(&self) {
        for (key, subscribers) in self.inner.subscriptions.snapshot() {
            tracing::info!("Subscription {} -> {:?}", key, subscribers);
        }
    }

    /// Hand a command to the worker pool.
    ///
    /// Blocks until a worker accepts it; the queue holds no buffer.
    pub fn send_command(&self, command: Command, target_id: &str) -> Result<(), MediatorError> {
        // Clone the sender so the lock isn't held while blocked on hand-off
        let sender = self
            .inner
            .queue
            .lock()
            .clone()
            .ok_or(MediatorError::QueueClosed)?;

        tracing::debug!("Queueing command for {}: {}", target_id, command.description());
        sender
            .send(QueuedCommand {
                command,
                target_id: target_id.to_string(),
            })
            .map_err(|_| MediatorError::QueueClosed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.queue.lock().is_none()
    }

    /// Stop accepting commands and wait for the workers to drain.
    ///
    /// Commands already handed to a worker finish executing. Calling this
    /// again is a no-op.
    pub fn shutdown(&self) {
        let Some(sender) = self.inner.queue.lock().take() else {
            return;
        };
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self.inner.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in workers {
            // A worker shutting the mediator down cannot join itself
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("Command worker panicked during shutdown");
            }
        }
        tracing::info!("Mediator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleFactory, ModuleState};
    use crate::source::ScriptedSource;
    use crossbeam_channel::unbounded;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn factory(mediator: &Mediator) -> ModuleFactory {
        ModuleFactory::new(mediator, Arc::new(ScriptedSource::constant(7)))
    }

    #[test]
    fn test_register_and_get_module() {
        let mediator = Mediator::new(2);
        let a = factory(&mediator).create_module("a");

        assert!(mediator.get_module("a").is_none());
        assert!(mediator.register_module(a.clone()).is_none());
        assert!(Arc::ptr_eq(&mediator.get_module("a").unwrap(), &a));
        assert_eq!(mediator.module_ids(), vec!["a".to_string()]);

        mediator.shutdown();
    }

    #[test]
    fn test_last_registration_wins() {
        let mediator = Mediator::new(1);
        let factory = factory(&mediator);
        let first = factory.create_module("a");
        let second = factory.create_module("a");

        mediator.register_module(first.clone());
        let previous = mediator.register_module(second.clone()).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert!(Arc::ptr_eq(&mediator.get_module("a").unwrap(), &second));

        mediator.shutdown();
    }

    #[test]
    fn test_unregister_unknown_module() {
        let mediator = Mediator::new(1);
        match mediator.unregister_module("ghost") {
            Err(MediatorError::ModuleNotFound(id)) => assert_eq!(id, "ghost"),
            _ => panic!("Expected ModuleNotFound"),
        }
        mediator.shutdown();
    }

    #[test]
    fn test_unregister_keeps_subscriptions() {
        let mediator = Mediator::new(1);
        let b = factory(&mediator).create_module("b");
        mediator.register_module(b);
        mediator.subscribe("b", "a", "x");

        mediator.unregister_module("b").unwrap();
        assert!(mediator.is_subscribed("b", "a", "x"));
        // Missing subscriber is skipped silently
        assert_eq!(mediator.notify_subscribers("a", "x", &json!(1)), 0);

        mediator.shutdown();
    }

    #[test]
    fn test_notify_skips_errored_subscribers() {
        let mediator = Mediator::new(1);
        let factory = factory(&mediator);
        let b = factory.create_module("b");
        let c = factory.create_module("c");
        mediator.register_module(b.clone());
        mediator.register_module(c.clone());
        mediator.subscribe("b", "a", "x");
        mediator.subscribe("c", "a", "x");

        // Put c in Error without letting its background task publish
        c.transition_to_running();
        c.mark_error();
        assert_eq!(c.state(), ModuleState::Error);

        assert_eq!(mediator.notify_subscribers("a", "x", &json!("v")), 1);

        mediator.shutdown();
    }

    #[test]
    fn test_send_command_reaches_workers() {
        let mediator = Mediator::new(3);
        let factory = factory(&mediator);
        let a = factory.create_module("a");
        let b = factory.create_module("b");
        mediator.register_module(a);
        mediator.register_module(b.clone());

        let (tx, rx) = unbounded();
        b.set_notification_callback(move |_, value| {
            let _ = tx.send(value.clone());
        });

        mediator
            .send_command(Command::subscribe("b", "a", "x"), "b")
            .unwrap();
        assert!(wait_until(Duration::from_secs(2), || mediator
            .is_subscribed("b", "a", "x")));

        mediator
            .send_command(Command::publish("a", "x", json!(5)), "a")
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), json!(5));

        mediator.shutdown();
    }

    #[test]
    fn test_commands_for_unknown_target_are_dropped() {
        let mediator = Mediator::new(1);
        mediator
            .send_command(Command::subscribe("ghost", "a", "x"), "ghost")
            .unwrap();
        mediator.shutdown();
        assert_eq!(mediator.subscription_count(), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_kill_worker() {
        let mediator = Mediator::new(1);
        let factory = factory(&mediator);
        let a = factory.create_module("a");
        let b = factory.create_module("b");
        mediator.register_module(a);
        mediator.register_module(b.clone());
        mediator.subscribe("b", "a", "x");

        let (tx, rx) = unbounded();
        b.set_notification_callback(move |_, value| {
            if *value == json!(1) {
                panic!("subscriber blew up");
            }
            let _ = tx.send(value.clone());
        });
        mediator
            .send_command(Command::publish("a", "x", json!(1)), "a")
            .unwrap();

        // The single worker must still be alive to take the next command
        mediator
            .send_command(Command::publish("a", "x", json!(2)), "a")
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), json!(2));

        mediator.shutdown();
    }

    #[test]
    fn test_shutdown_closes_queue() {
        let mediator = Mediator::new(2);
        assert!(!mediator.is_shut_down());

        mediator.shutdown();
        assert!(mediator.is_shut_down());
        assert!(matches!(
            mediator.send_command(Command::subscribe("b", "a", "x"), "b"),
            Err(MediatorError::QueueClosed)
        ));

        // Second shutdown is a no-op
        mediator.shutdown();
    }

    #[test]
    fn test_send_blocks_while_worker_busy() {
        let mediator = Mediator::new(1);
        let factory = factory(&mediator);
        mediator.register_module(factory.create_module("a"));
        let b = factory.create_module("b");
        mediator.register_module(b.clone());
        mediator.subscribe("b", "a", "x");

        // Hold the only worker inside b's callback until released
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        b.set_notification_callback(move |_, _| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
        });
        mediator
            .send_command(Command::publish("a", "x", json!(1)), "a")
            .unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let (sent_tx, sent_rx) = unbounded();
        let sender = mediator.clone();
        let handle = thread::spawn(move || {
            let result = sender.send_command(Command::subscribe("b", "a", "y"), "b");
            let _ = sent_tx.send(result.is_ok());
        });

        // No buffer: the hand-off waits for the worker
        assert!(sent_rx.recv_timeout(Duration::from_millis(200)).is_err());

        release_tx.send(()).unwrap();
        assert!(sent_rx.recv_timeout(Duration::from_secs(2)).unwrap());
        handle.join().unwrap();

        assert!(wait_until(Duration::from_secs(2), || mediator
            .is_subscribed("b", "a", "y")));
        mediator.shutdown();
    }

    #[test]
    fn test_zero_workers_clamped() {
        let mediator = Mediator::new(0);
        assert_eq!(mediator.worker_count(), 1);
        mediator.shutdown();
    }
}
