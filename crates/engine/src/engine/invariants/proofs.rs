//! Machine-checkable invariant proofs for the sync engine.

use std::sync::Arc;
use std::time::Duration;

use postvotes_protocol::VoteDirection;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::channel::MemoryChannel;
use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::document::{ElementHandle, MemoryDocument, NodeHandle, NodeRole};
use crate::engine::{EngineHandle, EngineParts, EngineState, SyncEngine};
use crate::store::MemoryStore;

const NOW: i64 = 1_700_000_000_000;

struct Harness {
	engine: SyncEngine,
	handle: EngineHandle,
	channel: MemoryChannel,
	doc: MemoryDocument,
	store: MemoryStore,
	clock: ManualClock,
}

impl Harness {
	fn new() -> Self {
		let channel = MemoryChannel::new();
		let doc = MemoryDocument::new();
		let store = MemoryStore::new();
		let clock = ManualClock::new(NOW);
		let engine = SyncEngine::new(EngineParts {
			channel: Arc::new(channel.clone()),
			store: Arc::new(store.clone()),
			document: Box::new(doc.clone()),
			clock: Arc::new(clock.clone()),
			config: EngineConfig::default(),
		})
		.unwrap();
		let handle = engine.handle();
		Self {
			engine,
			handle,
			channel,
			doc,
			store,
			clock,
		}
	}

	async fn authenticate(&mut self) {
		self.engine.launch("key-1".into()).unwrap();
		self.engine.pump().await;
		self.accept_auth().await;
	}

	async fn accept_auth(&mut self) {
		self.channel.push("auth", json!({"status": true, "userId": 42, "version": "2.1"}));
		self.engine.pump().await;
		assert_eq!(self.engine.state(), EngineState::Active);
	}

	async fn answer_scores(&mut self, ack: Value) {
		assert_eq!(self.channel.answer_ack(ack).as_deref(), Some("get-scores"));
		self.engine.pump().await;
	}

	async fn push(&mut self, event: &str, payload: Value) {
		self.channel.push(event, payload);
		self.engine.pump().await;
	}

	/// Moves both the wall clock and tokio time, lets timer tasks post, then
	/// drains the inbox.
	async fn advance(&mut self, by: Duration) {
		self.clock.advance(by);
		tokio::time::advance(by).await;
		for _ in 0..8 {
			tokio::task::yield_now().await;
		}
		self.engine.pump().await;
	}

	fn control(&self, element: ElementHandle, direction: VoteDirection) -> NodeHandle {
		self.doc.find_node(element, NodeRole::Control(direction)).unwrap().0
	}

	fn score_text(&self, element: ElementHandle) -> String {
		self.doc.find_node(element, NodeRole::Score).unwrap().1.text
	}
}

/// Blocks are marked processed in the pass that requests them, so later ticks
/// never re-request them while the acknowledgement is outstanding.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_scan_marks_processed_before_request() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	let comment = h.doc.add_block("comment_2");
	h.authenticate().await;

	assert!(h.doc.is_processed(post));
	assert!(h.doc.is_processed(comment));
	assert_eq!(
		h.channel.emitted_named("get-scores"),
		vec![json!({"entities": {"post": ["1"], "comment": ["2"]}})]
	);

	h.advance(Duration::from_secs(7)).await;
	assert_eq!(h.channel.emitted_named("get-scores").len(), 1);
	assert_eq!(h.channel.pending_acks(), 1);
}

/// Two discovery passes over an unchanged page leave one set of nodes per entity.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_repeated_discovery_is_idempotent() {
	let mut h = Harness::new();
	h.doc.add_block("post_1");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {"post_1": 3}, "userVotes": {}})).await;
	assert_eq!(h.doc.injected_count(), 4);

	h.advance(Duration::from_secs(3)).await;
	h.advance(Duration::from_secs(3)).await;
	assert_eq!(h.channel.emitted_named("get-scores").len(), 1);
	assert_eq!(h.engine.registry().len(), 1);
	assert_eq!(h.doc.injected_count(), 4);

	let late = h.doc.add_block("post_2");
	h.advance(Duration::from_secs(3)).await;
	assert_eq!(
		h.channel.emitted_named("get-scores").last(),
		Some(&json!({"entities": {"post": ["2"]}}))
	);
	h.answer_scores(json!({"scores": {"post_2": 1}, "userVotes": {}})).await;
	assert_eq!(h.score_text(late), "1");
	assert_eq!(h.doc.injected_count(), 8);
}

/// A disconnect removes every injected node and processed marker.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_disconnect_restores_page() {
	let mut h = Harness::new();
	h.doc.add_block("post_1");
	h.doc.add_block("widget_5");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {"post_1": 3}, "userVotes": {"post_1": "up"}})).await;

	h.channel.server_drop();
	h.engine.pump().await;
	assert_eq!(h.engine.state(), EngineState::Disconnected);
	assert_eq!(h.handle.state(), EngineState::Disconnected);
	assert!(h.engine.registry().is_empty());
	assert_eq!(h.doc.injected_count(), 0);
	assert_eq!(h.doc.processed_count(), 0);
	assert!(h.engine.pending.is_empty());

	// Poll ticks after teardown do nothing.
	h.advance(Duration::from_secs(10)).await;
	assert_eq!(h.channel.emitted_named("get-scores").len(), 1);

	h.channel.server_connect();
	h.engine.pump().await;
	assert_eq!(h.engine.state(), EngineState::Authenticating);
	h.accept_auth().await;
	assert_eq!(h.channel.emitted_named("get-scores").len(), 2);
}

/// `vote-cast` scores overwrite the display, and replays change nothing.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_vote_cast_scores_are_absolute() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {"post_1": 2}, "userVotes": {}})).await;

	let cast = json!({"scores": {"post_1": 7}, "userVotes": {}});
	h.push("vote-cast", cast.clone()).await;
	assert_eq!(h.score_text(post), "7");
	h.push("vote-cast", cast).await;
	assert_eq!(h.score_text(post), "7");
}

/// Vote entries of other users never touch local control state.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_foreign_votes_do_not_render() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {}, "userVotes": {"post_1": "down"}})).await;

	h.push(
		"vote-cast",
		json!({"scores": {"post_1": 5}, "userVotes": {"post_1": {"userId": 99, "direction": "up"}}}),
	)
	.await;
	let up = h.doc.node(h.control(post, VoteDirection::Up)).unwrap();
	let down = h.doc.node(h.control(post, VoteDirection::Down)).unwrap();
	assert!(!up.active);
	assert!(down.active);
	assert_eq!(h.score_text(post), "5");
}

/// An acknowledgement that outlives its session injects nothing.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_stale_scores_ack_is_noop() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;

	h.channel.server_drop();
	h.engine.pump().await;
	h.channel.server_connect();
	h.engine.pump().await;
	h.accept_auth().await;
	assert_eq!(h.channel.pending_acks(), 2);
	assert_eq!(h.engine.pending.len(), 1);

	h.answer_scores(json!({"scores": {"post_1": 9}, "userVotes": {}})).await;
	assert_eq!(h.doc.injected_count(), 0);
	assert!(h.doc.is_processed(post));

	h.answer_scores(json!({"scores": {"post_1": 4}, "userVotes": {}})).await;
	assert_eq!(h.doc.injected_count(), 4);
	assert_eq!(h.score_text(post), "4");
}

/// A push sent after a `get-scores` answer is applied on top of that answer.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_scores_ack_precedes_later_pushes() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;

	h.channel.answer_ack(json!({"scores": {"post_1": 5}, "userVotes": {}}));
	h.channel.push(
		"vote-cast",
		json!({"scores": {"post_1": 6}, "userVotes": {"post_1": {"userId": 42, "direction": "up"}}}),
	);
	h.engine.pump().await;

	assert_eq!(h.score_text(post), "6");
	assert!(h.doc.node(h.control(post, VoteDirection::Up)).unwrap().active);
	assert!(h.engine.pending.is_empty());
}

/// A server lockout disables controls until it elapses, then re-enables them once.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_lockout_reenables_once() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {}, "userVotes": {}})).await;

	h.push("vote-limit-reached", json!({"allowVotingIn": 5})).await;
	assert_eq!(h.store.value("42_limited_until").as_deref(), Some((NOW + 5_000).to_string().as_str()));
	let up = h.control(post, VoteDirection::Up);
	assert!(h.doc.node(up).unwrap().disabled);

	h.advance(Duration::from_secs(2)).await;
	assert!(h.doc.node(up).unwrap().disabled);

	h.advance(Duration::from_secs(3)).await;
	let node = h.doc.node(up).unwrap();
	assert!(!node.disabled);
	assert_eq!(node.title.as_deref(), Some("Upvote"));
	assert!(!h.engine.scheduler.is_armed());
	assert!(!h.engine.scheduler.controls_disabled());
}

/// Inactive controls cast their own direction; active ones retract.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_activation_toggles() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.authenticate().await;
	h.answer_scores(json!({"scores": {"post_1": 0}, "userVotes": {}})).await;
	let up = h.control(post, VoteDirection::Up);

	h.handle.activate(up).unwrap();
	h.engine.pump().await;
	assert_eq!(h.channel.emitted_named("vote"), vec![json!({"type": "post", "id": "1", "direction": "up"})]);
	// No optimistic update: the control stays inactive until the server says so.
	assert!(!h.doc.node(up).unwrap().active);

	h.push("vote-cast", json!({"scores": {"post_1": 1}, "userVotes": {"post_1": {"userId": "42", "direction": "up"}}}))
		.await;
	assert!(h.doc.node(up).unwrap().active);

	h.handle.activate(up).unwrap();
	h.engine.pump().await;
	assert_eq!(
		h.channel.emitted_named("vote").last(),
		Some(&json!({"type": "post", "id": "1", "direction": null}))
	);
}

/// Activations of disabled controls emit nothing.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_disabled_activation_is_ignored() {
	let mut h = Harness::new();
	let post = h.doc.add_block("post_1");
	h.store.insert("42_limited_until", (NOW + 60_000).to_string());
	h.authenticate().await;
	h.answer_scores(json!({"scores": {}, "userVotes": {}})).await;
	let down = h.control(post, VoteDirection::Down);
	assert!(h.doc.node(down).unwrap().disabled);

	h.handle.activate(down).unwrap();
	h.engine.pump().await;
	assert!(h.channel.emitted_named("vote").is_empty());
}

/// Foreign identifiers are claimed and then left alone.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_malformed_identifier_is_skipped() {
	let mut h = Harness::new();
	let widget = h.doc.add_block("widget_99");
	h.doc.add_block("post_1");
	h.authenticate().await;

	assert!(h.doc.is_processed(widget));
	assert_eq!(h.channel.emitted_named("get-scores"), vec![json!({"entities": {"post": ["1"]}})]);
	h.answer_scores(json!({"scores": {"post_1": 1}, "userVotes": {}})).await;
	assert!(h.doc.slot_nodes(widget).is_empty());
	assert_eq!(h.doc.injected_count(), 4);

	// Only foreign blocks left: no request at all.
	let mut only_foreign = Harness::new();
	only_foreign.doc.add_block("widget_1");
	only_foreign.authenticate().await;
	assert!(only_foreign.channel.emitted_named("get-scores").is_empty());
}

/// A rejected credential closes the channel and starts nothing.
#[cfg_attr(test, tokio::test(flavor = "current_thread", start_paused = true))]
pub(crate) async fn test_rejected_auth_closes_channel() {
	let mut h = Harness::new();
	h.doc.add_block("post_1");
	h.engine.launch("bad-key".into()).unwrap();
	h.engine.pump().await;
	assert_eq!(h.channel.emitted_named("auth"), vec![json!({"apiKey": "bad-key"})]);

	h.push("auth", json!({"status": false})).await;
	assert_eq!(h.engine.state(), EngineState::Disconnected);
	assert_eq!(h.channel.disconnect_calls(), 1);
	assert!(!h.channel.is_connected());

	h.advance(Duration::from_secs(10)).await;
	assert!(h.channel.emitted_named("get-scores").is_empty());
	assert_eq!(h.doc.processed_count(), 0);
}
