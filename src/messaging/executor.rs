/// Command worker pool
///
/// Workers share one receiving end of the unbuffered command queue. Each
/// dequeues a command, resolves its target and runs it. A failing or
/// panicking command is logged and the worker moves on.
use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use super::commands::{Command, CommandResult};
use super::mediator::WeakMediator;

/// A command together with the id of the module it must run against
#[derive(Debug)]
pub(crate) struct QueuedCommand {
    pub command: Command,
    pub target_id: String,
}

/// Start one worker thread
pub(crate) fn spawn_worker(
    index: usize,
    queue: Receiver<QueuedCommand>,
    mediator: WeakMediator,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("mediator-worker-{}", index))
        .spawn(move || {
            tracing::debug!("Command worker {} started", index);

            while let Ok(queued) = queue.recv() {
                // The mediator is gone once every strong handle dropped
                let Some(mediator) = mediator.upgrade() else {
                    break;
                };

                let Some(target) = mediator.get_module(&queued.target_id) else {
                    tracing::debug!(
                        "Dropping command for unknown module {}: {}",
                        queued.target_id,
                        queued.command.description()
                    );
                    continue;
                };

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    queued.command.execute(&target, &mediator)
                }));

                match outcome {
                    Ok(CommandResult::Ignored(reason)) => {
                        tracing::debug!(
                            "Command ignored by {}: {} ({})",
                            queued.target_id,
                            queued.command.description(),
                            reason
                        );
                    }
                    Ok(result) => {
                        tracing::trace!(
                            "Command executed on {}: {} -> {:?}",
                            queued.target_id,
                            queued.command.description(),
                            result
                        );
                    }
                    Err(_) => {
                        tracing::error!(
                            "Error executing command on {}: {} panicked",
                            queued.target_id,
                            queued.command.description()
                        );
                    }
                }
            }

            tracing::debug!("Command worker {} stopped", index);
        })
}
