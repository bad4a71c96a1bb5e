/// Modules
///
/// A module is an addressable unit with a lifecycle, an optional notification
/// sink and a background task that periodically publishes a value.
///
/// ```text
///   Init ──transition_to_running──> Running ──stop_background_process──> Shutdown
///                                    │   ▲
///                 fetch failure /    │   │  resolve_error
///                 mark_error         ▼   │
///                                    Error
/// ```
///
/// Specialized variants (compressor, dispenser) are the same `Module` carrying
/// a payload and a strategy slot.

pub mod base;
pub mod factory;
pub mod specialization;
pub mod state;
mod task;

// Re-export commonly used types
pub use base::{Module, NotificationCallback, PublishSchedule};
pub use factory::ModuleFactory;
pub use specialization::{ModuleKind, Specialization};
pub use state::{ModuleState, ModuleStateMachine, TransitionError};
pub use task::Control;
