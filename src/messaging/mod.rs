/// Messaging module: the mediator and its command pipeline
///
/// Modules never reference each other. They turn intents into commands and
/// hand them to the mediator, whose workers execute them:
///
/// ```text
/// ┌─────────┐  Command   ┌───────────────┐  dequeue   ┌─────────┐
/// │ Module  │ ─────────> │ command queue │ ─────────> │ Workers │
/// └─────────┘  (blocks)  │ (unbuffered)  │            └─────────┘
///      ▲                 └───────────────┘                 │
///      │ notify_subscriber                                  │ execute
///      │                 ┌──────────────────────┐          ▼
///      └──────────────── │ Mediator             │ <── subscribe / unsubscribe
///                        │  registry            │     notify_subscribers
///                        │  subscription table  │
///                        └──────────────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let mediator = Mediator::new(5);
/// let factory = ModuleFactory::new(&mediator, source);
///
/// let a = factory.create_module("A");
/// let b = factory.create_module("B");
/// mediator.register_module(a.clone());
/// mediator.register_module(b.clone());
///
/// b.set_notification_callback(|topic, value| println!("{topic} = {value}"));
/// b.subscribe_to_topic("x", "A");
/// a.publish_to_topic("x", 42);
///
/// mediator.shutdown();
/// ```
///
/// With more than one worker, commands submitted concurrently for the same
/// target may run in any order.

pub mod commands;
mod executor;
pub mod mediator;
pub mod subscriptions;

// Re-export commonly used types
pub use commands::{Command, CommandResult};
pub use mediator::{Mediator, WeakMediator, DEFAULT_WORKER_COUNT};
pub use subscriptions::{SubscriptionKey, SubscriptionTable, UnsubscribeOutcome};
