//! Entity references shared by the host page and the wire.
//!
//! Host elements carry identifiers such as `post_1234` or `comment_99`; the
//! same string is used as the entity key in every score and vote map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Kind of votable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
	/// A top-level forum post.
	Post,
	/// A comment on an image.
	Comment,
}

impl EntityKind {
	/// Wire spelling of this kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Post => "post",
			Self::Comment => "comment",
		}
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EntityKind {
	type Err = ProtocolError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"post" => Ok(Self::Post),
			"comment" => Ok(Self::Comment),
			other => Err(ProtocolError::InvalidEntityKey(other.to_owned())),
		}
	}
}

/// Reference to one votable record: `(kind, id)`.
///
/// The id is kept as an opaque string of ASCII digits; it is never interpreted
/// numerically so leading zeros and large values survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
	kind: EntityKind,
	id: String,
}

impl EntityRef {
	/// Builds a reference, rejecting ids that are empty or contain non-digits.
	pub fn new(kind: EntityKind, id: impl Into<String>) -> Result<Self> {
		let id = id.into();
		if !is_digits(&id) {
			return Err(ProtocolError::InvalidEntityKey(format!("{kind}_{id}")));
		}
		Ok(Self { kind, id })
	}

	/// Derives a reference from a host element identifier.
	///
	/// Returns `None` for anything other than `(post|comment)_<digits>`.
	pub fn parse(identifier: &str) -> Option<Self> {
		Self::from_key(identifier).ok()
	}

	/// Parses a wire entity key.
	pub fn from_key(key: &str) -> Result<Self> {
		let (kind, id) = key
			.split_once('_')
			.ok_or_else(|| ProtocolError::InvalidEntityKey(key.to_owned()))?;
		let kind = kind
			.parse::<EntityKind>()
			.map_err(|_| ProtocolError::InvalidEntityKey(key.to_owned()))?;
		Self::new(kind, id).map_err(|_| ProtocolError::InvalidEntityKey(key.to_owned()))
	}

	/// Kind of the referenced record.
	pub const fn kind(&self) -> EntityKind {
		self.kind
	}

	/// Opaque id of the referenced record.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Wire key, identical to the host element identifier.
	pub fn key(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for EntityRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}_{}", self.kind, self.id)
	}
}

impl FromStr for EntityRef {
	type Err = ProtocolError;

	fn from_str(s: &str) -> Result<Self> {
		Self::from_key(s)
	}
}

fn is_digits(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_post_and_comment_identifiers() {
		let post = EntityRef::parse("post_1").unwrap();
		assert_eq!(post.kind(), EntityKind::Post);
		assert_eq!(post.id(), "1");

		let comment = EntityRef::parse("comment_0042").unwrap();
		assert_eq!(comment.kind(), EntityKind::Comment);
		assert_eq!(comment.id(), "0042");
		assert_eq!(comment.key(), "comment_0042");
	}

	#[test]
	fn rejects_foreign_identifiers() {
		for id in ["widget_99", "post_", "post_12a", "post", "_12", "Post_1", "post_1_2", ""] {
			assert!(EntityRef::parse(id).is_none(), "{id} should not parse");
		}
	}

	#[test]
	fn new_validates_id() {
		assert!(EntityRef::new(EntityKind::Post, "17").is_ok());
		assert!(matches!(
			EntityRef::new(EntityKind::Post, "x"),
			Err(ProtocolError::InvalidEntityKey(key)) if key == "post_x"
		));
	}

	#[test]
	fn kind_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&EntityKind::Comment).unwrap(), "\"comment\"");
		let kind: EntityKind = serde_json::from_str("\"post\"").unwrap();
		assert_eq!(kind, EntityKind::Post);
	}
}
