//! Real-time channel seam.
//!
//! The transport behind a [`Channel`] (handshake, framing, retry with a fixed
//! reconnection delay) is a black box to the engine. The engine only needs the
//! lifecycle events, named message delivery, fire-and-forget emits and emits
//! that expect a single acknowledgement.
//!
//! Acknowledgements travel on the same ordered stream as everything else, so
//! an ack the server sent before a push is handled before that push.

pub mod memory;

use postvotes_protocol::ClientEvent;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{Error, Result};

pub use memory::{Emitted, MemoryChannel};

/// Correlates a [`ChannelEvent::Ack`] with the emit that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AckId(pub u64);

/// Inbound channel traffic, delivered in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
	/// The transport (re)established a connection.
	Connected,
	/// The transport lost or closed its connection.
	Disconnected,
	/// A named server event.
	Message {
		/// Event name.
		event: String,
		/// JSON payload.
		payload: Value,
	},
	/// The server acknowledged a [`Channel::emit_with_ack`] emit.
	Ack {
		/// Id returned by the emit.
		id: AckId,
		/// Acknowledgement payload.
		payload: Value,
	},
}

/// Bidirectional named-event transport with automatic reconnection.
///
/// All operations are non-blocking; results arrive through [`Channel::events`]
/// or through the acknowledgement receiver.
pub trait Channel: Send + Sync + 'static {
	/// Takes the inbound event stream. Only the first call succeeds.
	fn events(&self) -> Result<mpsc::UnboundedReceiver<ChannelEvent>>;

	/// Opens the connection; the transport keeps reconnecting after drops.
	fn connect(&self) -> Result<()>;

	/// Closes the connection without scheduling a reconnect.
	fn disconnect(&self) -> Result<()>;

	/// Emits a named event without waiting for an answer.
	fn emit(&self, event: &str, payload: Value) -> Result<()>;

	/// Emits a named event and returns the id its [`ChannelEvent::Ack`] will carry.
	///
	/// The ack is queued on [`Channel::events`] in arrival order. A transport may
	/// drop unanswered acks on disconnect; one that still arrives after a
	/// reconnect is delivered like any other.
	fn emit_with_ack(&self, event: &str, payload: Value) -> Result<AckId>;
}

impl dyn Channel {
	/// Serializes and emits a typed client event.
	pub fn send<E: ClientEvent>(&self, event: &E) -> Result<()> {
		self.emit(E::NAME, serde_json::to_value(event)?)
	}

	/// Serializes and emits a typed client event that expects an acknowledgement.
	pub fn request<E: ClientEvent>(&self, event: &E) -> Result<AckId> {
		self.emit_with_ack(E::NAME, serde_json::to_value(event)?)
	}
}

pub(crate) fn closed(what: &str) -> Error {
	Error::Channel(format!("{what}: channel closed"))
}
