/// Module lifecycle state machine
///
/// Init → Running → Shutdown, with Running ⇄ Error as a side loop.

/// Lifecycle state of a module
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModuleState {
    /// Created, background task not started
    #[default]
    Init,

    /// Background task active
    Running,

    /// Background task stopped for good
    Shutdown,

    /// Paused after a failure, waiting for recovery
    Error,
}

impl ModuleState {
    pub fn is_running(&self) -> bool {
        matches!(self, ModuleState::Running)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ModuleState::Error)
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            ModuleState::Init => "Init",
            ModuleState::Running => "Running",
            ModuleState::Shutdown => "Shutdown",
            ModuleState::Error => "Error",
        }
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Rejected state transitions. Callers treat these as logged no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Only an Init module can start
    NotInit(ModuleState),

    /// Only a Running module can stop or fail
    NotRunning(ModuleState),

    /// Only an Error module can recover
    NotInError(ModuleState),
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::NotInit(state) => write!(f, "module is {}, not Init", state),
            TransitionError::NotRunning(state) => write!(f, "module is {}, not Running", state),
            TransitionError::NotInError(state) => write!(f, "module is {}, not Error", state),
        }
    }
}

impl std::error::Error for TransitionError {}

/// State machine for module transitions
#[derive(Debug, Default)]
pub struct ModuleStateMachine {
    state: ModuleState,
}

impl ModuleStateMachine {
    pub fn new() -> Self {
        Self {
            state: ModuleState::Init,
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Init → Running
    pub fn start(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ModuleState::Init => {
                self.state = ModuleState::Running;
                Ok(())
            }
            other => Err(TransitionError::NotInit(other)),
        }
    }

    /// Running → Shutdown
    pub fn stop(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ModuleState::Running => {
                self.state = ModuleState::Shutdown;
                Ok(())
            }
            other => Err(TransitionError::NotRunning(other)),
        }
    }

    /// Running → Error
    pub fn fail(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ModuleState::Running => {
                self.state = ModuleState::Error;
                Ok(())
            }
            other => Err(TransitionError::NotRunning(other)),
        }
    }

    /// Error → Running
    pub fn recover(&mut self) -> Result<(), TransitionError> {
        match self.state {
            ModuleState::Error => {
                self.state = ModuleState::Running;
                Ok(())
            }
            other => Err(TransitionError::NotInError(other)),
        }
    }
}
