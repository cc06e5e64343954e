//! Handle for controlling a running poller.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Buffer size for the command channel between handle and poller.
pub(crate) const COMMAND_CHANNEL_BUFFER: usize = 8;

/// Errors that can occur controlling the poller.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The poller task is gone or unresponsive.
    #[error("scheduler channel error: {0}")]
    ChannelError(String),
}

/// State of the poller loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// Commands sent from the handle to the poller loop.
pub(crate) enum SchedulerCommand {
    Shutdown { response: oneshot::Sender<()> },
}

/// Cloneable handle for controlling the poller.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) command_tx: mpsc::Sender<SchedulerCommand>,
    pub(crate) state: Arc<RwLock<SchedulerState>>,
}

impl SchedulerHandle {
    /// Stop the poller loop. In-flight probe dispatches finish on their own;
    /// no new ticks run.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::Shutdown {
                response: response_tx,
            })
            .await
            .map_err(|_| SchedulerError::ChannelError("failed to send shutdown".to_string()))?;

        response_rx
            .await
            .map_err(|_| SchedulerError::ChannelError("failed to receive shutdown ack".to_string()))
    }

    /// Current state of the poller loop.
    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == SchedulerState::Running
    }
}
