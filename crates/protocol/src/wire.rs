//! Request, acknowledgement and push payloads.
//!
//! Field names follow the server's camelCase JSON; every map keyed by entity
//! uses the `<kind>_<id>` key produced by [`EntityRef::key`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, EntityRef};
use crate::vote::{UserId, VoteDirection};

/// Client → server: authenticate with an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
	/// The user's API key.
	pub api_key: String,
}

/// Account details some server versions nest inside the auth response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
	/// Account id.
	pub id: UserId,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
}

/// Server → client: outcome of an [`AuthRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
	/// Whether the credential was accepted.
	pub status: bool,
	/// Authenticated account id.
	#[serde(default)]
	pub user_id: Option<UserId>,
	/// Nested account details.
	#[serde(default)]
	pub user: Option<AuthUser>,
	/// Server version string.
	#[serde(default)]
	pub version: Option<String>,
}

impl AuthResponse {
	/// Account id from either the flat or the nested form.
	pub fn user_id(&self) -> Option<&UserId> {
		self.user_id.as_ref().or_else(|| self.user.as_ref().map(|u| &u.id))
	}

	/// Display name, when the server sent one.
	pub fn user_name(&self) -> Option<&str> {
		self.user.as_ref().and_then(|u| u.name.as_deref())
	}
}

/// Client → server: fetch scores and own votes for a batch of entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetScoresRequest {
	/// Entity ids grouped by kind.
	pub entities: BTreeMap<EntityKind, Vec<String>>,
}

impl GetScoresRequest {
	/// Groups `entities` by kind, preserving discovery order within a kind.
	pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a EntityRef>) -> Self {
		let mut grouped: BTreeMap<EntityKind, Vec<String>> = BTreeMap::new();
		for entity in entities {
			grouped.entry(entity.kind()).or_default().push(entity.id().to_owned());
		}
		Self { entities: grouped }
	}

	/// Total number of requested entities.
	pub fn len(&self) -> usize {
		self.entities.values().map(Vec::len).sum()
	}

	/// Returns true when no entity is requested.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Server → client: acknowledgement of a [`GetScoresRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScoresAck {
	/// Current score per entity key.
	#[serde(default)]
	pub scores: HashMap<String, i64>,
	/// The requesting user's vote per entity key.
	#[serde(default)]
	pub user_votes: HashMap<String, Option<VoteDirection>>,
}

impl GetScoresAck {
	/// Score for `entity`, defaulting to zero when the server omitted it.
	pub fn score_for(&self, entity: &EntityRef) -> i64 {
		self.scores.get(&entity.key()).copied().unwrap_or(0)
	}

	/// Own vote for `entity`.
	pub fn vote_for(&self, entity: &EntityRef) -> Option<VoteDirection> {
		self.user_votes.get(&entity.key()).copied().flatten()
	}
}

/// Client → server: cast, change or retract a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
	/// Entity kind.
	#[serde(rename = "type")]
	pub kind: EntityKind,
	/// Entity id.
	pub id: String,
	/// Requested direction; `None` retracts.
	pub direction: Option<VoteDirection>,
}

impl VoteRequest {
	/// Builds a request for `entity`.
	pub fn new(entity: &EntityRef, direction: Option<VoteDirection>) -> Self {
		Self {
			kind: entity.kind(),
			id: entity.id().to_owned(),
			direction,
		}
	}
}

/// One user's vote inside a [`VoteCast`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVote {
	/// Voter.
	pub user_id: UserId,
	/// The voter's current direction.
	#[serde(default)]
	pub direction: Option<VoteDirection>,
}

/// Server push: authoritative scores and votes after a vote was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
	/// Absolute score per entity key.
	#[serde(default)]
	pub scores: HashMap<String, i64>,
	/// Vote state per entity key.
	#[serde(default)]
	pub user_votes: HashMap<String, UserVote>,
}

/// Server push: the user hit the per-user vote limit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteLimitReached {
	/// Seconds until voting is allowed again.
	pub allow_voting_in: f64,
}

impl VoteLimitReached {
	/// Lockout length; negative or non-finite values collapse to zero.
	pub fn lockout(&self) -> Duration {
		if self.allow_voting_in.is_finite() && self.allow_voting_in > 0.0 {
			Duration::try_from_secs_f64(self.allow_voting_in).unwrap_or(Duration::MAX)
		} else {
			Duration::ZERO
		}
	}
}

/// Server push: generic throttling notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitNotice {
	/// Allowed number of actions per window.
	pub threshold: u64,
	/// Window length in seconds.
	pub ttl: u64,
}

impl RateLimitNotice {
	/// Message shown to the user.
	pub fn message(&self) -> String {
		format!(
			"You are voting too quickly. At most {} votes are allowed every {} seconds, please wait a moment before trying again.",
			self.threshold, self.ttl
		)
	}
}
