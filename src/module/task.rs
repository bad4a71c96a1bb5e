/// Module background task
///
/// Ticks on the module's interval. Each tick either publishes a freshly
/// fetched value, pauses on the control channel while the module is in
/// Error, or exits.
use crossbeam_channel::{select, tick, Receiver};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::base::Module;
use super::state::ModuleState;

/// Messages on a module's private control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Leave the loop for good
    Stop,
    /// Continue after an error was resolved
    Resume,
}

enum Tick {
    Continue,
    Pause,
    Exit,
}

pub(super) fn spawn(
    id: &str,
    module: Weak<Module>,
    control: Receiver<Control>,
    interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    let id = id.to_string();
    thread::Builder::new()
        .name(format!("module-{}", id))
        .spawn(move || {
            run(&module, &control, interval);
            tracing::debug!("Module {} background process exited", id);
        })
}

fn run(module: &Weak<Module>, control: &Receiver<Control>, interval: Duration) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(control) -> message => match message {
                Ok(Control::Stop) | Err(_) => return,
                // Not paused, nothing to resume
                Ok(Control::Resume) => {}
            },
            recv(ticker) -> _ => {
                let outcome = match module.upgrade() {
                    Some(module) => on_tick(&module),
                    None => Tick::Exit,
                };
                match outcome {
                    Tick::Continue => {}
                    Tick::Exit => return,
                    Tick::Pause => match control.recv() {
                        Ok(Control::Resume) => {}
                        Ok(Control::Stop) | Err(_) => return,
                    },
                }
            }
        }
    }
}

fn on_tick(module: &Module) -> Tick {
    match module.state() {
        ModuleState::Error => {
            tracing::info!(
                "Module {} is in Error state, pausing background process",
                module.id()
            );
            Tick::Pause
        }
        ModuleState::Shutdown => Tick::Exit,
        ModuleState::Init | ModuleState::Running => match module.fetch_value() {
            Ok(value) => {
                module.publish_to_topic(&module.schedule().topic, value);
                Tick::Continue
            }
            Err(e) => {
                module.fail_from_task(&e);
                Tick::Exit
            }
        },
    }
}
