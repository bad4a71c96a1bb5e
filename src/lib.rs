//! In-process publish/subscribe broker.
//!
//! Modules exchange named values through a [`Mediator`] without holding
//! references to each other. Subscribe, unsubscribe and publish requests are
//! turned into [`Command`]s and executed by the mediator's worker pool.

pub mod config;
pub mod error;
pub mod messaging;
pub mod module;
pub mod source;
pub mod strategy;

pub use serde_json::Value;

pub use config::BrokerConfig;
pub use error::{ConfigError, FetchError, MediatorError, StrategyError};
pub use messaging::{Command, Mediator};
pub use module::{Module, ModuleFactory, ModuleKind, ModuleState};
