//! Invariant catalog for [`crate::engine::SyncEngine`].
#![allow(dead_code)]

/// Must mark every scanned block processed before its `get-scores` request is emitted.
///
/// - Enforced in: [`crate::registry::ElementRegistry::claim_unprocessed`], `SyncEngine::discover`
/// - Tested by: [`crate::engine::invariants::test_scan_marks_processed_before_request`]
/// - Failure symptom: Overlapping poll ticks request the same block twice and inject duplicate controls.
pub(crate) const SCAN_MARKS_PROCESSED_BEFORE_REQUEST: () = ();

/// Must inject at most one set of controls per block and per entity.
///
/// - Enforced in: [`crate::registry::ElementRegistry::register`]
/// - Tested by: [`crate::engine::invariants::test_repeated_discovery_is_idempotent`]
/// - Failure symptom: Score and arrows rendered twice next to one post.
pub(crate) const REGISTRATION_IS_IDEMPOTENT: () = ();

/// Must leave no injected node and no processed marker after a disconnect.
///
/// - Enforced in: `SyncEngine::teardown`, [`crate::registry::ElementRegistry::unregister_all`]
/// - Tested by: [`crate::engine::invariants::test_disconnect_restores_page`]
/// - Failure symptom: Stale controls survive a reconnect, or blocks are never rediscovered.
pub(crate) const DISCONNECT_RESTORES_PAGE: () = ();

/// Must render `vote-cast` scores verbatim.
///
/// - Enforced in: `reconcile::apply_vote_cast`
/// - Tested by: [`crate::engine::invariants::test_vote_cast_scores_are_absolute`]
/// - Failure symptom: Replayed pushes drift the displayed score.
pub(crate) const VOTE_CAST_SCORES_ARE_ABSOLUTE: () = ();

/// Must render only the authenticated user's vote entries.
///
/// - Enforced in: `reconcile::apply_vote_cast`
/// - Tested by: [`crate::engine::invariants::test_foreign_votes_do_not_render`]
/// - Failure symptom: Another user's click highlights the local user's arrows.
pub(crate) const ONLY_OWN_VOTES_RENDER: () = ();

/// Must apply a `get-scores` acknowledgement before any push the server sent after it.
///
/// - Enforced in: [`crate::channel::Channel::emit_with_ack`] (acks share the event stream), `SyncEngine::next_event`
/// - Tested by: [`crate::engine::invariants::test_scores_ack_precedes_later_pushes`]
/// - Failure symptom: A fresh `vote-cast` is dropped for an unregistered entity, then the older ack renders a stale
///   score.
pub(crate) const SCORES_ACK_PRECEDES_LATER_PUSHES: () = ();

/// Must drop `get-scores` acknowledgements issued by an ended session.
///
/// - Enforced in: `SyncEngine::on_ack`
/// - Tested by: [`crate::engine::invariants::test_stale_scores_ack_is_noop`]
/// - Failure symptom: Controls injected after teardown, into blocks no longer marked processed.
pub(crate) const STALE_SCORES_ACK_IS_NOOP: () = ();

/// Must keep at most one lockout timer and re-enable controls exactly once when it fires.
///
/// - Enforced in: [`crate::ratelimit::RateLimitScheduler::refresh`], [`crate::ratelimit::RateLimitScheduler::on_timer`]
/// - Tested by: [`crate::engine::invariants::test_lockout_reenables_once`]
/// - Failure symptom: Controls flicker enabled early, or stay disabled forever.
pub(crate) const SINGLE_LOCKOUT_TIMER: () = ();

/// Activation must toggle: active control retracts, inactive control casts its own direction.
///
/// - Enforced in: [`crate::registry::ElementRegistry::activation`]
/// - Tested by: [`crate::engine::invariants::test_activation_toggles`]
/// - Failure symptom: Clicking an active arrow re-sends the same vote instead of retracting it.
pub(crate) const ACTIVATION_TOGGLES: () = ();

/// Disabled controls must not emit votes.
///
/// - Enforced in: [`crate::registry::ElementRegistry::activation`], `SyncEngine::on_activate`
/// - Tested by: [`crate::engine::invariants::test_disabled_activation_is_ignored`]
/// - Failure symptom: Votes sent during a lockout the server will reject anyway.
pub(crate) const DISABLED_ACTIVATION_IS_IGNORED: () = ();

/// Blocks with identifiers outside `(post|comment)_<digits>` must be claimed but never requested or injected.
///
/// - Enforced in: [`crate::registry::ElementRegistry::claim_unprocessed`]
/// - Tested by: [`crate::engine::invariants::test_malformed_identifier_is_skipped`]
/// - Failure symptom: Foreign blocks rescanned every tick, or garbage keys sent to the server.
pub(crate) const MALFORMED_IDENTIFIER_IS_SKIPPED: () = ();

/// A rejected credential must close the channel and keep the engine inert.
///
/// - Enforced in: `SyncEngine::on_auth`
/// - Tested by: [`crate::engine::invariants::test_rejected_auth_closes_channel`]
/// - Failure symptom: Discovery traffic from an unauthenticated client.
pub(crate) const REJECTED_AUTH_CLOSES_CHANNEL: () = ();
