//! Applying server state to the registry.

use postvotes_protocol::wire::{GetScoresAck, VoteCast};
use postvotes_protocol::{EntityRef, UserId};

use crate::document::{ElementHandle, HostDocument};
use crate::registry::ElementRegistry;

/// Injects controls for every block claimed by a discovery pass, seeded from
/// the `get-scores` acknowledgement. Returns how many blocks gained controls.
pub(crate) fn apply_scores(
	registry: &mut ElementRegistry,
	document: &mut dyn HostDocument,
	claimed: Vec<(ElementHandle, EntityRef)>,
	ack: &GetScoresAck,
) -> usize {
	let mut registered = 0;
	for (element, entity) in claimed {
		let score = ack.score_for(&entity);
		let vote = ack.vote_for(&entity);
		if registry.register(document, entity, element, score, vote).is_some() {
			registered += 1;
		}
	}
	registered
}

/// Applies a `vote-cast` push.
///
/// Scores are absolute, so applying the same push twice renders the same page.
/// Vote entries from other users are ignored.
pub(crate) fn apply_vote_cast(
	registry: &mut ElementRegistry,
	document: &mut dyn HostDocument,
	own_user: &UserId,
	cast: &VoteCast,
) {
	for (key, score) in &cast.scores {
		match EntityRef::from_key(key) {
			Ok(entity) => {
				registry.set_score(document, &entity, *score);
			}
			Err(e) => tracing::trace!(key = %key, error = %e, "skipping score for unknown key"),
		}
	}

	for (key, vote) in &cast.user_votes {
		if &vote.user_id != own_user {
			continue;
		}
		match EntityRef::from_key(key) {
			Ok(entity) => {
				registry.set_vote(document, &entity, vote.direction);
			}
			Err(e) => tracing::trace!(key = %key, error = %e, "skipping vote for unknown key"),
		}
	}
}
