//! Machine-checkable invariant catalog and proof entrypoints for the sync engine.
#![allow(dead_code)]

pub(crate) mod catalog;

#[allow(unused_imports)]
pub(crate) use catalog::{
	ACTIVATION_TOGGLES, DISABLED_ACTIVATION_IS_IGNORED, DISCONNECT_RESTORES_PAGE, MALFORMED_IDENTIFIER_IS_SKIPPED,
	ONLY_OWN_VOTES_RENDER, REGISTRATION_IS_IDEMPOTENT, REJECTED_AUTH_CLOSES_CHANNEL, SCAN_MARKS_PROCESSED_BEFORE_REQUEST,
	SCORES_ACK_PRECEDES_LATER_PUSHES, SINGLE_LOCKOUT_TIMER, STALE_SCORES_ACK_IS_NOOP, VOTE_CAST_SCORES_ARE_ABSOLUTE,
};

#[cfg(doc)]
pub(crate) async fn test_scan_marks_processed_before_request() {}

#[cfg(doc)]
pub(crate) async fn test_repeated_discovery_is_idempotent() {}

#[cfg(doc)]
pub(crate) async fn test_disconnect_restores_page() {}

#[cfg(doc)]
pub(crate) async fn test_vote_cast_scores_are_absolute() {}

#[cfg(doc)]
pub(crate) async fn test_foreign_votes_do_not_render() {}

#[cfg(doc)]
pub(crate) async fn test_scores_ack_precedes_later_pushes() {}

#[cfg(doc)]
pub(crate) async fn test_stale_scores_ack_is_noop() {}

#[cfg(doc)]
pub(crate) async fn test_lockout_reenables_once() {}

#[cfg(doc)]
pub(crate) async fn test_activation_toggles() {}

#[cfg(doc)]
pub(crate) async fn test_disabled_activation_is_ignored() {}

#[cfg(doc)]
pub(crate) async fn test_malformed_identifier_is_skipped() {}

#[cfg(doc)]
pub(crate) async fn test_rejected_auth_closes_channel() {}

#[cfg(test)]
mod proofs;

#[cfg(test)]
#[allow(unused_imports)]
pub(crate) use proofs::{
	test_activation_toggles, test_disabled_activation_is_ignored, test_disconnect_restores_page,
	test_foreign_votes_do_not_render, test_lockout_reenables_once, test_malformed_identifier_is_skipped,
	test_rejected_auth_closes_channel, test_repeated_discovery_is_idempotent, test_scan_marks_processed_before_request,
	test_scores_ack_precedes_later_pushes, test_stale_scores_ack_is_noop, test_vote_cast_scores_are_absolute,
};
