//! Synchronization and lifecycle engine.
//!
//! # Purpose
//!
//! - Bind host content blocks to remote entities, render their score and the user's vote, and keep both in step
//!   with the voting server over a [`Channel`].
//! - Gate voting on the server-declared lockout window through the [`RateLimitScheduler`].
//!
//! # Mental model
//!
//! - [`SyncEngine`] is an actor. Channel traffic, host commands, timer firings and `get-scores` acknowledgements
//!   all land in one inbox and are handled one at a time, so no locks guard engine state.
//! - Acknowledgements arrive on the channel's event stream, so pushes and acks are handled in the order the
//!   server sent them.
//! - A session starts when the server accepts the credential and ends at the next disconnect. Everything the
//!   session built (injected nodes, processed markers, timers, outstanding `get-scores` requests) is torn down
//!   with it; the next connect rebuilds it from scratch. Only the persisted lockout window survives.
//! - Discovery is a periodic scan that claims blocks by marking them processed before asking for their scores.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`SyncEngine`] | The actor | Must be the only writer of the registry and the document | [`SyncEngine::new`], [`SyncEngine::run`] |
//! | [`EngineHandle`] | Host-side sender into the inbox | Requests are queued, never handled inline | [`SyncEngine::handle`] |
//! | [`EngineState`] | Lifecycle state | Published on every transition | `SyncEngine::set_state` |
//! | `Session` | Authenticated user plus generation | Replaced on every auth, cleared on disconnect | `SyncEngine::on_auth` |
//! | [`ElementRegistry`] | Claimed blocks and their nodes | Lives exactly one session | `SyncEngine::on_ack`, `SyncEngine::teardown` |
//! | [`RateLimitScheduler`] | Lockout window enforcement | At most one live lockout timer | `SyncEngine::refresh_lockout` |
//!
//! # Invariants
//!
//! - Must mark every scanned block processed before the `get-scores` request leaves.
//! - Must not inject a second set of controls for a block or entity.
//! - Must leave no injected node and no processed marker after teardown.
//! - Must render scores verbatim and only the authenticated user's votes.
//! - Must handle a `get-scores` acknowledgement before any push the server sent after it.
//! - Must drop `get-scores` acknowledgements issued by an earlier session.
//! - Must ignore timer firings whose generation is no longer armed.
//! - Must ignore activations of disabled controls.
//!
//! # Data flow
//!
//! - [`SyncEngine::start`] resolves the credential and calls [`SyncEngine::launch`], which opens the channel.
//! - `connect` → emit `auth`. `auth` accepted → new session, poll timer armed, immediate discovery pass.
//! - Discovery: claim unprocessed blocks → one `get-scores` → on ack inject controls → refresh the lockout.
//! - Pushes (`vote-cast`, `vote-limit-reached`, `rate-limit`) are decoded into [`PushEvent`] and applied by
//!   `SyncEngine::reconcile` while a session is live.
//! - `disconnect` → cancel both timers, unregister everything, drop the session.

mod handle;
mod invariants;
mod reconcile;
mod session;

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

#[cfg(test)]
use futures::FutureExt;
use postvotes_protocol::wire::{AuthRequest, AuthResponse, GetScoresAck, GetScoresRequest};
use postvotes_protocol::{PushEvent, ServerEvent};
use tokio::sync::{mpsc, watch};

pub use self::handle::EngineHandle;
use self::handle::Command;
use self::session::{PendingScores, Session};
use crate::channel::{AckId, Channel, ChannelEvent};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::credential::{CredentialSource, HostPage};
use crate::document::{HostDocument, NodeHandle};
use crate::ratelimit::RateLimitScheduler;
use crate::registry::{Activation, ElementRegistry};
use crate::store::PersistentStore;
use crate::timer::{TimerFired, TimerKind, TimerSlot};
use crate::{Error, Result};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
	/// No connection, or the server rejected the credential.
	#[default]
	Disconnected,
	/// The channel is being opened for the first time.
	Connecting,
	/// `auth` was emitted; waiting for the verdict.
	Authenticating,
	/// A session is live.
	Active,
}

impl EngineState {
	const fn as_str(self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Authenticating => "authenticating",
			Self::Active => "active",
		}
	}
}

/// Collaborators handed to [`SyncEngine::new`].
pub struct EngineParts {
	/// Channel to the voting server, already pointed at the resolved server URL.
	pub channel: Arc<dyn Channel>,
	/// Durable key-value store.
	pub store: Arc<dyn PersistentStore>,
	/// The host page.
	pub document: Box<dyn HostDocument>,
	/// Wall clock for lockout arithmetic.
	pub clock: Arc<dyn Clock>,
	/// Tunables.
	pub config: EngineConfig,
}

enum Inbound {
	Channel(ChannelEvent),
	Timer(TimerFired),
	Command(Command),
}

/// The page agent's actor.
pub struct SyncEngine {
	channel: Arc<dyn Channel>,
	document: Box<dyn HostDocument>,
	config: EngineConfig,
	registry: ElementRegistry,
	scheduler: RateLimitScheduler,
	poll: TimerSlot,
	state: EngineState,
	state_tx: watch::Sender<EngineState>,
	session: Option<Session>,
	next_session: u64,
	api_key: Option<String>,
	channel_rx: mpsc::UnboundedReceiver<ChannelEvent>,
	command_tx: mpsc::UnboundedSender<Command>,
	command_rx: mpsc::UnboundedReceiver<Command>,
	timer_rx: mpsc::UnboundedReceiver<TimerFired>,
	pending: HashMap<AckId, PendingScores>,
}

impl SyncEngine {
	/// Builds an engine in [`EngineState::Disconnected`].
	///
	/// # Errors
	///
	/// Fails when the channel's event stream was already taken.
	pub fn new(parts: EngineParts) -> Result<Self> {
		let EngineParts {
			channel,
			store,
			document,
			clock,
			config,
		} = parts;
		let channel_rx = channel.events()?;
		let (command_tx, command_rx) = mpsc::unbounded_channel();
		let (timer_tx, timer_rx) = mpsc::unbounded_channel();
		let (state_tx, _) = watch::channel(EngineState::Disconnected);

		Ok(Self {
			channel,
			document,
			config,
			registry: ElementRegistry::new(),
			scheduler: RateLimitScheduler::new(clock, store, timer_tx.clone()),
			poll: TimerSlot::new(TimerKind::Poll, timer_tx),
			state: EngineState::Disconnected,
			state_tx,
			session: None,
			next_session: 0,
			api_key: None,
			channel_rx,
			command_tx,
			command_rx,
			timer_rx,
			pending: HashMap::new(),
		})
	}

	/// Returns a handle for host-side requests and state observation.
	pub fn handle(&self) -> EngineHandle {
		EngineHandle::new(self.command_tx.clone(), self.state_tx.subscribe())
	}

	/// Current lifecycle state.
	pub fn state(&self) -> EngineState {
		self.state
	}

	/// Read-only view of the registry.
	pub fn registry(&self) -> &ElementRegistry {
		&self.registry
	}

	/// Resolves the credential, opens the channel and runs until shutdown.
	///
	/// # Errors
	///
	/// Credential failures are terminal: they are logged and returned without
	/// ever touching the channel.
	pub async fn start<P: HostPage>(mut self, credentials: CredentialSource<P>) -> Result<()> {
		let api_key = match credentials.resolve().await {
			Ok(key) => key,
			Err(e) => {
				tracing::warn!(error = %e, "voting unavailable");
				return Err(e);
			}
		};
		if let Err(e) = self.launch(api_key) {
			tracing::warn!(error = %e, "could not open channel");
			return Err(e);
		}
		self.run().await;
		Ok(())
	}

	/// Opens the channel with `api_key`. Only the first call has an effect.
	pub fn launch(&mut self, api_key: String) -> Result<()> {
		if self.api_key.is_some() {
			tracing::debug!("engine already launched");
			return Ok(());
		}
		self.api_key = Some(api_key);
		self.set_state(EngineState::Connecting);
		self.channel.connect()
	}

	/// Drains the inbox until shutdown, then tears the session down.
	pub async fn run(mut self) {
		while let Some(event) = self.next_event().await {
			if self.dispatch(event).await.is_break() {
				break;
			}
		}
		self.teardown();
	}

	/// Handles every event that is ready without waiting. Returns how many were
	/// handled.
	#[cfg(test)]
	pub(crate) async fn pump(&mut self) -> usize {
		let mut handled = 0;
		while let Some(Some(event)) = self.next_event().now_or_never() {
			handled += 1;
			if self.dispatch(event).await.is_break() {
				break;
			}
		}
		handled
	}

	async fn next_event(&mut self) -> Option<Inbound> {
		tokio::select! {
			biased;
			Some(event) = self.channel_rx.recv() => Some(Inbound::Channel(event)),
			Some(fired) = self.timer_rx.recv() => Some(Inbound::Timer(fired)),
			Some(command) = self.command_rx.recv() => Some(Inbound::Command(command)),
			else => None,
		}
	}

	async fn dispatch(&mut self, event: Inbound) -> ControlFlow<()> {
		let result = match event {
			Inbound::Channel(ChannelEvent::Connected) => self.on_connected(),
			Inbound::Channel(ChannelEvent::Disconnected) => {
				self.on_disconnected();
				Ok(())
			}
			Inbound::Channel(ChannelEvent::Message { event, payload }) => self.on_message(&event, payload).await,
			Inbound::Channel(ChannelEvent::Ack { id, payload }) => self.on_ack(id, payload).await,
			Inbound::Timer(fired) => self.on_timer(fired),
			Inbound::Command(Command::Activate(node)) => self.on_activate(node),
			Inbound::Command(Command::Shutdown) => {
				self.shutdown();
				return ControlFlow::Break(());
			}
		};
		match result {
			Ok(()) => {}
			Err(Error::AuthRejected) => tracing::info!("authentication failed"),
			Err(e) => tracing::warn!(error = %e, state = self.state.as_str(), "event handling failed"),
		}
		ControlFlow::Continue(())
	}

	fn on_connected(&mut self) -> Result<()> {
		if self.session.is_some() || self.state == EngineState::Authenticating {
			tracing::debug!("connect without disconnect, restarting session");
			self.teardown();
		}
		let Some(api_key) = self.api_key.clone() else {
			tracing::debug!("connected before launch, ignoring");
			return Ok(());
		};
		tracing::info!("connected to voting server");
		self.channel.send(&AuthRequest { api_key })?;
		self.set_state(EngineState::Authenticating);
		Ok(())
	}

	fn on_disconnected(&mut self) {
		if self.state != EngineState::Disconnected {
			tracing::info!("disconnected");
		}
		self.teardown();
	}

	async fn on_message(&mut self, event: &str, payload: serde_json::Value) -> Result<()> {
		match ServerEvent::decode(event, payload)? {
			ServerEvent::Auth(response) => self.on_auth(response),
			ServerEvent::Push(push) if self.session.is_some() => self.reconcile(push).await,
			ServerEvent::Push(push) => {
				tracing::trace!(event = push.name(), "ignoring push outside a session");
				Ok(())
			}
		}
	}

	fn on_auth(&mut self, response: AuthResponse) -> Result<()> {
		if self.state != EngineState::Authenticating {
			tracing::debug!(state = self.state.as_str(), "ignoring unsolicited auth response");
			return Ok(());
		}
		let user_id = match response.user_id() {
			Some(id) if response.status => id.clone(),
			_ => {
				self.set_state(EngineState::Disconnected);
				self.channel.disconnect()?;
				return Err(Error::AuthRejected);
			}
		};

		self.next_session += 1;
		let session = Session {
			generation: self.next_session,
			user_id,
			user_name: response.user_name().map(str::to_owned),
		};
		tracing::info!(
			user_id = %session.user_id,
			user_name = session.user_name.as_deref().unwrap_or("unknown"),
			server_version = response.version.as_deref().unwrap_or("unknown"),
			"authenticated"
		);
		self.session = Some(session);
		self.set_state(EngineState::Active);
		self.poll.arm_interval(self.config.poll_interval());
		self.discover()
	}

	/// Claims every unprocessed block and requests their scores in one batch.
	fn discover(&mut self) -> Result<()> {
		let Some(session) = &self.session else {
			return Ok(());
		};
		let generation = session.generation;
		let claimed = self.registry.claim_unprocessed(self.document.as_mut());
		if claimed.is_empty() {
			return Ok(());
		}

		let request = GetScoresRequest::from_entities(claimed.iter().map(|(_, entity)| entity));
		tracing::debug!(count = request.len(), "found new elements to hook into");
		if request.is_empty() {
			return Ok(());
		}
		let id = self.channel.request(&request)?;
		self.pending.insert(
			id,
			PendingScores {
				session: generation,
				claimed,
			},
		);
		Ok(())
	}

	async fn on_ack(&mut self, id: AckId, payload: serde_json::Value) -> Result<()> {
		let Some(pending) = self.pending.remove(&id) else {
			tracing::trace!(ack = id.0, "dropping acknowledgement with no outstanding request");
			return Ok(());
		};
		if self.session.as_ref().is_none_or(|s| s.generation != pending.session) {
			tracing::trace!(session = pending.session, "dropping get-scores reply from an ended session");
			return Ok(());
		}
		let ack: GetScoresAck = serde_json::from_value(payload)?;
		let registered = reconcile::apply_scores(&mut self.registry, self.document.as_mut(), pending.claimed, &ack);
		tracing::debug!(registered, total = self.registry.len(), "applied get-scores acknowledgement");
		self.refresh_lockout().await
	}

	/// Dispatches a server push. Only called while a session is live.
	async fn reconcile(&mut self, push: PushEvent) -> Result<()> {
		let Some(user_id) = self.session.as_ref().map(|s| s.user_id.clone()) else {
			return Ok(());
		};
		match push {
			PushEvent::VoteCast(cast) => {
				tracing::trace!(scores = cast.scores.len(), votes = cast.user_votes.len(), "vote cast");
				reconcile::apply_vote_cast(&mut self.registry, self.document.as_mut(), &user_id, &cast);
				Ok(())
			}
			PushEvent::VoteLimitReached(limit) => {
				let window = self.scheduler.record(&user_id, limit.lockout()).await?;
				tracing::info!(user_id = %user_id, until_ms = window.until_ms, "vote limit reached");
				self.refresh_lockout().await
			}
			PushEvent::RateLimit(notice) => {
				tracing::warn!(threshold = notice.threshold, ttl = notice.ttl, "throttled by server");
				self.document.show_notice(&notice.message());
				Ok(())
			}
		}
	}

	async fn refresh_lockout(&mut self) -> Result<()> {
		let Some(user_id) = self.session.as_ref().map(|s| s.user_id.clone()) else {
			return Ok(());
		};
		self.scheduler.refresh(&user_id, &mut self.registry, self.document.as_mut()).await?;
		Ok(())
	}

	fn on_timer(&mut self, fired: TimerFired) -> Result<()> {
		match fired.kind {
			TimerKind::Poll if self.poll.is_current(fired.generation) => self.discover(),
			TimerKind::Poll => {
				tracing::trace!(generation = fired.generation, "ignoring stale poll tick");
				Ok(())
			}
			TimerKind::Lockout => {
				self.scheduler.on_timer(fired.generation, &mut self.registry, self.document.as_mut());
				Ok(())
			}
		}
	}

	fn on_activate(&mut self, node: NodeHandle) -> Result<()> {
		if self.session.is_none() {
			return Ok(());
		}
		match self.registry.activation(node) {
			Activation::Unknown => {
				tracing::trace!(node = node.0, "activation of unknown node");
				Ok(())
			}
			Activation::Disabled => {
				tracing::debug!(node = node.0, "ignoring activation of disabled control");
				Ok(())
			}
			Activation::Vote(request) => {
				tracing::debug!(kind = %request.kind, id = %request.id, direction = ?request.direction, "voting");
				self.channel.send(&request)
			}
		}
	}

	fn shutdown(&mut self) {
		tracing::info!("shutting down");
		self.teardown();
		if let Err(e) = self.channel.disconnect() {
			tracing::debug!(error = %e, "channel disconnect during shutdown failed");
		}
	}

	/// Cancels both timers, forgets outstanding requests, removes every injected
	/// node and drops the session.
	fn teardown(&mut self) {
		self.poll.cancel();
		self.scheduler.cancel();
		self.pending.clear();
		self.registry.unregister_all(self.document.as_mut());
		self.session = None;
		self.set_state(EngineState::Disconnected);
	}

	fn set_state(&mut self, state: EngineState) {
		if self.state != state {
			tracing::trace!(from = self.state.as_str(), to = state.as_str(), "engine state");
		}
		self.state = state;
		self.state_tx.send_replace(state);
	}
}
