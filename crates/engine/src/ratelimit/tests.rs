use std::sync::Arc;
use std::time::Duration;

use postvotes_protocol::{EntityKind, EntityRef, UserId, VoteDirection};
use tokio::sync::mpsc;

use super::*;
use crate::clock::ManualClock;
use crate::document::MemoryDocument;
use crate::registry::ElementRegistry;
use crate::store::MemoryStore;

const NOW: i64 = 1_700_000_000_000;

struct Fixture {
	clock: ManualClock,
	store: MemoryStore,
	scheduler: RateLimitScheduler,
	timers: mpsc::UnboundedReceiver<TimerFired>,
	registry: ElementRegistry,
	doc: MemoryDocument,
}

fn fixture() -> Fixture {
	let clock = ManualClock::new(NOW);
	let store = MemoryStore::new();
	let (tx, timers) = mpsc::unbounded_channel();
	let scheduler = RateLimitScheduler::new(Arc::new(clock.clone()), Arc::new(store.clone()), tx);
	let mut doc = MemoryDocument::new();
	let mut registry = ElementRegistry::new();
	let el = doc.add_block("post_1");
	registry.register(&mut doc, EntityRef::new(EntityKind::Post, "1").unwrap(), el, 0, None);
	Fixture {
		clock,
		store,
		scheduler,
		timers,
		registry,
		doc,
	}
}

fn user() -> UserId {
	UserId::new("42")
}

fn up_node(f: &Fixture) -> crate::document::MemoryNode {
	let entry = f.registry.get(&EntityRef::new(EntityKind::Post, "1").unwrap()).unwrap();
	f.doc.node(entry.control(VoteDirection::Up).node).unwrap()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn remaining_time_strictly_decreases() {
	let f = fixture();
	f.scheduler.record(&user(), Duration::from_millis(5_000)).await.unwrap();
	assert_eq!(f.store.value("42_limited_until").as_deref(), Some((NOW + 5_000).to_string().as_str()));

	let LockState::Locked { remaining: first, until_ms } = f.scheduler.is_locked(&user()).await.unwrap() else {
		panic!("expected a live window");
	};
	assert_eq!(until_ms, NOW + 5_000);
	assert_eq!(first, Duration::from_millis(5_000));

	f.clock.advance(Duration::from_millis(1_200));
	let LockState::Locked { remaining: second, .. } = f.scheduler.is_locked(&user()).await.unwrap() else {
		panic!("expected a live window");
	};
	assert!(second < first);

	f.clock.advance(Duration::from_millis(3_800));
	assert_eq!(f.scheduler.is_locked(&user()).await.unwrap(), LockState::Unlocked);
	assert_eq!(f.scheduler.window(&user()).await.unwrap(), None);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn refresh_disables_and_timer_reenables_once() {
	let mut f = fixture();
	f.scheduler.record(&user(), Duration::from_secs(5)).await.unwrap();

	let state = f.scheduler.refresh(&user(), &mut f.registry, &mut f.doc).await.unwrap();
	assert!(state.is_locked());
	assert!(f.scheduler.is_armed());
	let node = up_node(&f);
	assert!(node.disabled);
	assert!(node.title.unwrap().starts_with("Voting is disabled until "));

	tokio::time::advance(Duration::from_secs(5)).await;
	let fired = f.timers.recv().await.unwrap();
	assert_eq!(fired.kind, TimerKind::Lockout);

	assert!(f.scheduler.on_timer(fired.generation, &mut f.registry, &mut f.doc));
	assert!(!f.scheduler.on_timer(fired.generation, &mut f.registry, &mut f.doc));
	let node = up_node(&f);
	assert!(!node.disabled);
	assert_eq!(node.title.as_deref(), Some("Upvote"));
	assert!(!f.scheduler.controls_disabled());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rearming_replaces_the_live_timer() {
	let mut f = fixture();
	f.scheduler.record(&user(), Duration::from_secs(2)).await.unwrap();
	f.scheduler.refresh(&user(), &mut f.registry, &mut f.doc).await.unwrap();
	f.scheduler.record(&user(), Duration::from_secs(10)).await.unwrap();
	f.scheduler.refresh(&user(), &mut f.registry, &mut f.doc).await.unwrap();

	tokio::time::advance(Duration::from_secs(3)).await;
	tokio::task::yield_now().await;
	assert!(f.timers.try_recv().is_err());
	assert!(up_node(&f).disabled);

	tokio::time::advance(Duration::from_secs(8)).await;
	let fired = f.timers.recv().await.unwrap();
	assert!(f.scheduler.on_timer(fired.generation, &mut f.registry, &mut f.doc));
	assert!(!up_node(&f).disabled);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn expired_window_enables_without_timer() {
	let mut f = fixture();
	f.store.insert("42_limited_until", (NOW - 1).to_string());

	let state = f.scheduler.refresh(&user(), &mut f.registry, &mut f.doc).await.unwrap();
	assert_eq!(state, LockState::Unlocked);
	assert!(!f.scheduler.is_armed());
	assert!(!up_node(&f).disabled);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn window_survives_a_new_scheduler() {
	let f = fixture();
	f.scheduler.record(&user(), Duration::from_secs(30)).await.unwrap();

	let (tx, _rx) = mpsc::unbounded_channel();
	let reloaded = RateLimitScheduler::new(Arc::new(f.clock.clone()), Arc::new(f.store.clone()), tx);
	assert!(reloaded.is_locked(&user()).await.unwrap().is_locked());
	assert_eq!(reloaded.is_locked(&UserId::new("7")).await.unwrap(), LockState::Unlocked);
}

#[test]
fn unreadable_timestamps_are_absent() {
	assert_eq!(parse_timestamp("1700000000000"), Some(1_700_000_000_000));
	assert_eq!(parse_timestamp("1700000000000.5"), Some(1_700_000_000_000));
	assert_eq!(parse_timestamp("soon"), None);
	assert_eq!(parse_timestamp("NaN"), None);
}

#[test]
fn tooltip_names_unlock_time() {
	let text = unlock_tooltip(NOW, Duration::from_secs(300));
	assert!(text.starts_with("Voting is disabled until "));
	assert!(text.ends_with("(in 5 minutes)"), "{text}");
}
