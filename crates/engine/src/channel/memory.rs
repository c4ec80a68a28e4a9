//! In-process [`Channel`] with a scriptable server side.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{AckId, Channel, ChannelEvent, closed};
use crate::{Error, Result};

/// One event emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
	/// Event name.
	pub event: String,
	/// JSON payload.
	pub payload: Value,
}

struct PendingAck {
	id: AckId,
	event: String,
}

struct Inner {
	event_tx: mpsc::UnboundedSender<ChannelEvent>,
	event_rx: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
	connected: bool,
	accept_connections: bool,
	connect_calls: usize,
	disconnect_calls: usize,
	emitted: Vec<Emitted>,
	next_ack: u64,
	pending_acks: VecDeque<PendingAck>,
}

/// Channel whose "server" is the code holding a clone of it.
///
/// The client half implements [`Channel`]; the `server_*`, [`Self::push`] and
/// [`Self::answer_ack`] methods play the remote authority.
#[derive(Clone)]
pub struct MemoryChannel {
	inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemoryChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("MemoryChannel")
			.field("connected", &inner.connected)
			.field("emitted", &inner.emitted.len())
			.field("pending_acks", &inner.pending_acks.len())
			.finish_non_exhaustive()
	}
}

impl Default for MemoryChannel {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryChannel {
	/// Creates a disconnected channel that accepts connections.
	pub fn new() -> Self {
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		Self {
			inner: Arc::new(Mutex::new(Inner {
				event_tx,
				event_rx: Some(event_rx),
				connected: false,
				accept_connections: true,
				connect_calls: 0,
				disconnect_calls: 0,
				emitted: Vec::new(),
				next_ack: 0,
				pending_acks: VecDeque::new(),
			})),
		}
	}

	/// Controls whether client [`Channel::connect`] calls succeed immediately.
	pub fn set_accept_connections(&self, accept: bool) {
		self.inner.lock().accept_connections = accept;
	}

	/// Server side: (re)establishes the connection, as a transport reconnect would.
	pub fn server_connect(&self) {
		let mut inner = self.inner.lock();
		inner.connected = true;
		let _ = inner.event_tx.send(ChannelEvent::Connected);
	}

	/// Server side: drops the connection.
	pub fn server_drop(&self) {
		let mut inner = self.inner.lock();
		inner.connected = false;
		let _ = inner.event_tx.send(ChannelEvent::Disconnected);
	}

	/// Server side: pushes a named event.
	pub fn push(&self, event: &str, payload: Value) {
		let inner = self.inner.lock();
		let _ = inner.event_tx.send(ChannelEvent::Message {
			event: event.to_owned(),
			payload,
		});
	}

	/// Server side: answers the oldest outstanding acknowledgement.
	///
	/// The answer is queued behind everything already pushed. Unanswered acks
	/// survive [`Self::server_drop`], so a test can deliver one late. Returns
	/// the acknowledged event name, or `None` when nothing was pending.
	pub fn answer_ack(&self, payload: Value) -> Option<String> {
		let mut inner = self.inner.lock();
		let pending = inner.pending_acks.pop_front()?;
		let _ = inner.event_tx.send(ChannelEvent::Ack { id: pending.id, payload });
		Some(pending.event)
	}

	/// Number of acknowledgements awaiting an answer.
	pub fn pending_acks(&self) -> usize {
		self.inner.lock().pending_acks.len()
	}

	/// Drains everything the client emitted so far.
	pub fn take_emitted(&self) -> Vec<Emitted> {
		std::mem::take(&mut self.inner.lock().emitted)
	}

	/// Payloads of emitted events named `event`, without draining.
	pub fn emitted_named(&self, event: &str) -> Vec<Value> {
		self.inner
			.lock()
			.emitted
			.iter()
			.filter(|e| e.event == event)
			.map(|e| e.payload.clone())
			.collect()
	}

	/// Whether the connection is currently up.
	pub fn is_connected(&self) -> bool {
		self.inner.lock().connected
	}

	/// Number of client [`Channel::connect`] calls.
	pub fn connect_calls(&self) -> usize {
		self.inner.lock().connect_calls
	}

	/// Number of client [`Channel::disconnect`] calls.
	pub fn disconnect_calls(&self) -> usize {
		self.inner.lock().disconnect_calls
	}

	fn record(inner: &mut Inner, event: &str, payload: Value) -> Result<()> {
		if !inner.connected {
			return Err(Error::Channel(format!("cannot emit '{event}' while disconnected")));
		}
		inner.emitted.push(Emitted {
			event: event.to_owned(),
			payload,
		});
		Ok(())
	}
}

impl Channel for MemoryChannel {
	fn events(&self) -> Result<mpsc::UnboundedReceiver<ChannelEvent>> {
		self.inner
			.lock()
			.event_rx
			.take()
			.ok_or_else(|| Error::Channel("event stream already taken".into()))
	}

	fn connect(&self) -> Result<()> {
		let mut inner = self.inner.lock();
		inner.connect_calls += 1;
		if inner.accept_connections && !inner.connected {
			inner.connected = true;
			inner.event_tx.send(ChannelEvent::Connected).map_err(|_| closed("connect"))?;
		}
		Ok(())
	}

	fn disconnect(&self) -> Result<()> {
		let mut inner = self.inner.lock();
		inner.disconnect_calls += 1;
		if inner.connected {
			inner.connected = false;
			inner.event_tx.send(ChannelEvent::Disconnected).map_err(|_| closed("disconnect"))?;
		}
		Ok(())
	}

	fn emit(&self, event: &str, payload: Value) -> Result<()> {
		Self::record(&mut self.inner.lock(), event, payload)
	}

	fn emit_with_ack(&self, event: &str, payload: Value) -> Result<AckId> {
		let mut inner = self.inner.lock();
		Self::record(&mut inner, event, payload)?;
		inner.next_ack += 1;
		let id = AckId(inner.next_ack);
		inner.pending_acks.push_back(PendingAck {
			id,
			event: event.to_owned(),
		});
		Ok(id)
	}
}
