/// Command types for the mediator
///
/// Commands are immutable requests routed to one target module. They are
/// executed once by a pool worker and then discarded. A command only touches
/// the registry and subscription table through `Mediator` methods.
use serde_json::Value;

use super::mediator::Mediator;
use super::subscriptions::UnsubscribeOutcome;
use crate::module::Module;

/// Mediator commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add `subscriber_id` to the subscribers of (publisher, topic)
    Subscribe {
        subscriber_id: String,
        publisher_id: String,
        topic: String,
    },

    /// Remove `subscriber_id` from the subscribers of (publisher, topic)
    Unsubscribe {
        subscriber_id: String,
        publisher_id: String,
        topic: String,
    },

    /// Fan a value out to every subscriber of (publisher, topic)
    PublishValue {
        publisher_id: String,
        topic: String,
        value: Value,
    },
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Subscription table changed (or was already in the requested shape)
    Applied,

    /// Value handed to this many subscribers
    Delivered(usize),

    /// Command was not honored, with the reason
    Ignored(String),
}

impl Command {
    pub fn subscribe(subscriber_id: &str, publisher_id: &str, topic: &str) -> Self {
        Command::Subscribe {
            subscriber_id: subscriber_id.to_string(),
            publisher_id: publisher_id.to_string(),
            topic: topic.to_string(),
        }
    }

    pub fn unsubscribe(subscriber_id: &str, publisher_id: &str, topic: &str) -> Self {
        Command::Unsubscribe {
            subscriber_id: subscriber_id.to_string(),
            publisher_id: publisher_id.to_string(),
            topic: topic.to_string(),
        }
    }

    pub fn publish(publisher_id: &str, topic: &str, value: Value) -> Self {
        Command::PublishValue {
            publisher_id: publisher_id.to_string(),
            topic: topic.to_string(),
            value,
        }
    }

    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::Subscribe {
                subscriber_id,
                publisher_id,
                topic,
            } => format!("Subscribe {} to {}:{}", subscriber_id, publisher_id, topic),
            Command::Unsubscribe {
                subscriber_id,
                publisher_id,
                topic,
            } => format!(
                "Unsubscribe {} from {}:{}",
                subscriber_id, publisher_id, topic
            ),
            Command::PublishValue {
                publisher_id,
                topic,
                value,
            } => format!("Publish {}:{} = {}", publisher_id, topic, value),
        }
    }

    /// Run the command against its target module
    pub fn execute(&self, target: &Module, mediator: &Mediator) -> CommandResult {
        match self {
            Command::Subscribe {
                subscriber_id,
                publisher_id,
                topic,
            } => {
                mediator.subscribe(subscriber_id, publisher_id, topic);
                CommandResult::Applied
            }
            Command::Unsubscribe {
                subscriber_id,
                publisher_id,
                topic,
            } => match mediator.unsubscribe(subscriber_id, publisher_id, topic) {
                UnsubscribeOutcome::Removed => CommandResult::Applied,
                miss => CommandResult::Ignored(format!("{:?}", miss)),
            },
            Command::PublishValue {
                publisher_id,
                topic,
                value,
            } => {
                // A misrouted publish must not be honored by the wrong module
                if target.id() != publisher_id {
                    return CommandResult::Ignored(format!(
                        "target {} is not publisher {}",
                        target.id(),
                        publisher_id
                    ));
                }
                CommandResult::Delivered(mediator.notify_subscribers(publisher_id, topic, value))
            }
        }
    }
}
