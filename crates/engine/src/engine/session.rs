//! Per-connection session state.

use postvotes_protocol::{EntityRef, UserId};

use crate::document::ElementHandle;

/// One authenticated connection. Dropped wholesale on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
	/// Monotonic per engine; replies tagged with an older generation are stale.
	pub generation: u64,
	pub user_id: UserId,
	pub user_name: Option<String>,
}

/// A `get-scores` request waiting for its acknowledgement.
#[derive(Debug)]
pub(crate) struct PendingScores {
	/// Session that issued the request.
	pub session: u64,
	/// Blocks claimed by the discovery pass that issued the request.
	pub claimed: Vec<(ElementHandle, EntityRef)>,
}
