//! Vote directions and user identity.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Direction of a cast vote.
///
/// The absence of a vote is modelled as `Option::<VoteDirection>::None`, which
/// is also how the wire spells it (`null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
	/// Upvote.
	Up,
	/// Downvote.
	Down,
}

impl VoteDirection {
	/// Both directions, in rendering order.
	pub const ALL: [Self; 2] = [Self::Up, Self::Down];

	/// Wire spelling of this direction.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Up => "up",
			Self::Down => "down",
		}
	}

	/// Human-readable control title.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Up => "Upvote",
			Self::Down => "Downvote",
		}
	}

	/// Direction requested when a control for `self` is activated.
	///
	/// An active control retracts the vote; an inactive one casts its own
	/// direction.
	pub const fn toggled(self, active: bool) -> Option<Self> {
		if active { None } else { Some(self) }
	}
}

impl fmt::Display for VoteDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identifier of a server-side user account.
///
/// The server is inconsistent about whether ids are numbers or strings, so both
/// are accepted and normalized to their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
	/// Wraps an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for UserId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Unsigned(u64),
			Signed(i64),
		}

		Ok(match Raw::deserialize(deserializer)? {
			Raw::Text(s) => Self(s),
			Raw::Unsigned(n) => Self(n.to_string()),
			Raw::Signed(n) => Self(n.to_string()),
		})
	}
}
