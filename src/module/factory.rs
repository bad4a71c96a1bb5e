/// Module factory
///
/// Builds every module variant the same way: same mediator, same value
/// source, same publish schedule.
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::base::{Module, PublishSchedule};
use super::specialization::ModuleKind;
use crate::config::BrokerConfig;
use crate::error::MediatorError;
use crate::messaging::{Mediator, WeakMediator};
use crate::source::{self, ValueSource};

#[derive(Clone)]
pub struct ModuleFactory {
    mediator: WeakMediator,
    source: Arc<dyn ValueSource>,
    schedule: PublishSchedule,
}

impl ModuleFactory {
    pub fn new(mediator: &Mediator, source: Arc<dyn ValueSource>) -> Self {
        Self {
            mediator: mediator.downgrade(),
            source,
            schedule: PublishSchedule::default(),
        }
    }

    /// Factory whose modules are not attached to any mediator
    pub fn detached(source: Arc<dyn ValueSource>) -> Self {
        Self {
            mediator: WeakMediator::default(),
            source,
            schedule: PublishSchedule::default(),
        }
    }

    pub fn from_config(mediator: &Mediator, config: &BrokerConfig) -> Self {
        Self::new(mediator, source::from_config(&config.source)).with_schedule(PublishSchedule {
            interval: Duration::from_millis(config.publish_interval_ms),
            topic: config.publish_topic.clone(),
        })
    }

    pub fn with_schedule(mut self, schedule: PublishSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn ValueSource>) -> Self {
        self.source = source;
        self
    }

    pub fn create_module(&self, id: &str) -> Arc<Module> {
        self.create(ModuleKind::Base, id, None)
    }

    pub fn create_compressor_module(&self, id: &str, payload: impl Into<Value>) -> Arc<Module> {
        self.create(ModuleKind::Compressor, id, Some(payload.into()))
    }

    pub fn create_dispenser_module(&self, id: &str, payload: impl Into<Value>) -> Arc<Module> {
        self.create(ModuleKind::Dispenser, id, Some(payload.into()))
    }

    /// Build any variant. Base modules ignore `payload`.
    pub fn create(&self, kind: ModuleKind, id: &str, payload: Option<Value>) -> Arc<Module> {
        Module::new(
            id,
            kind,
            payload,
            self.mediator.clone(),
            Arc::clone(&self.source),
            self.schedule.clone(),
        )
    }

    /// Build a variant named by string, e.g. from a config file
    pub fn create_named(
        &self,
        kind: &str,
        id: &str,
        payload: Option<Value>,
    ) -> Result<Arc<Module>, MediatorError> {
        Ok(self.create(kind.parse()?, id, payload))
    }
}
