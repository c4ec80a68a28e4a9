//! Event names and the closed set of server events.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::wire::{AuthRequest, AuthResponse, GetScoresRequest, RateLimitNotice, VoteCast, VoteLimitReached, VoteRequest};

/// Event names used on the channel.
pub mod names {
	/// Authentication request and response.
	pub const AUTH: &str = "auth";
	/// Batched score lookup (acknowledged).
	pub const GET_SCORES: &str = "get-scores";
	/// Vote intent.
	pub const VOTE: &str = "vote";
	/// Authoritative score/vote update.
	pub const VOTE_CAST: &str = "vote-cast";
	/// Per-user vote limit reached.
	pub const VOTE_LIMIT_REACHED: &str = "vote-limit-reached";
	/// Generic throttling notice.
	pub const RATE_LIMIT: &str = "rate-limit";
}

/// A payload the client emits under a fixed event name.
pub trait ClientEvent: Serialize {
	/// Event name on the channel.
	const NAME: &'static str;
}

impl ClientEvent for AuthRequest {
	const NAME: &'static str = names::AUTH;
}

impl ClientEvent for GetScoresRequest {
	const NAME: &'static str = names::GET_SCORES;
}

impl ClientEvent for VoteRequest {
	const NAME: &'static str = names::VOTE;
}

/// Server push that updates an active session.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
	/// Authoritative scores and votes.
	VoteCast(VoteCast),
	/// The user is locked out of voting for a while.
	VoteLimitReached(VoteLimitReached),
	/// Generic throttling notice.
	RateLimit(RateLimitNotice),
}

impl PushEvent {
	/// Event name this push arrived under.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::VoteCast(_) => names::VOTE_CAST,
			Self::VoteLimitReached(_) => names::VOTE_LIMIT_REACHED,
			Self::RateLimit(_) => names::RATE_LIMIT,
		}
	}
}

/// Every named event the agent reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
	/// Response to the authentication request.
	Auth(AuthResponse),
	/// Session push.
	Push(PushEvent),
}

impl ServerEvent {
	/// Decodes a named event and its JSON payload.
	pub fn decode(name: &str, payload: Value) -> Result<Self> {
		fn parse<T: serde::de::DeserializeOwned>(name: &str, payload: Value) -> Result<T> {
			serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
				event: name.to_owned(),
				source,
			})
		}

		match name {
			names::AUTH => parse(name, payload).map(Self::Auth),
			names::VOTE_CAST => parse(name, payload).map(|p| Self::Push(PushEvent::VoteCast(p))),
			names::VOTE_LIMIT_REACHED => parse(name, payload).map(|p| Self::Push(PushEvent::VoteLimitReached(p))),
			names::RATE_LIMIT => parse(name, payload).map(|p| Self::Push(PushEvent::RateLimit(p))),
			other => Err(ProtocolError::UnknownEvent(other.to_owned())),
		}
	}
}
