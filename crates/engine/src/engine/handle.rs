//! Host-facing handle to a running engine.

use tokio::sync::{mpsc, watch};

use super::EngineState;
use crate::document::NodeHandle;
use crate::{Error, Result};

/// Requests the host sends into the engine's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
	/// The user activated an injected node.
	Activate(NodeHandle),
	/// Tear everything down and stop.
	Shutdown,
}

/// Clonable sender side of the engine queue.
///
/// Every method is non-blocking: requests are queued and handled in order with
/// channel traffic and timer firings.
#[derive(Debug, Clone)]
pub struct EngineHandle {
	commands: mpsc::UnboundedSender<Command>,
	state: watch::Receiver<EngineState>,
}

impl EngineHandle {
	pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, state: watch::Receiver<EngineState>) -> Self {
		Self { commands, state }
	}

	/// Reports a click on an injected node.
	///
	/// # Errors
	///
	/// [`Error::EngineStopped`] once the engine task has exited.
	pub fn activate(&self, node: NodeHandle) -> Result<()> {
		self.send(Command::Activate(node))
	}

	/// Asks the engine to close the channel, drop its timers, remove every
	/// injected node and exit.
	pub fn shutdown(&self) -> Result<()> {
		self.send(Command::Shutdown)
	}

	/// Current lifecycle state.
	pub fn state(&self) -> EngineState {
		*self.state.borrow()
	}

	/// Receiver that observes every state transition.
	pub fn watch_state(&self) -> watch::Receiver<EngineState> {
		self.state.clone()
	}

	fn send(&self, command: Command) -> Result<()> {
		self.commands.send(command).map_err(|_| Error::EngineStopped)
	}
}
