//! Host document seam.
//!
//! The engine never touches a DOM directly. A [`HostDocument`] exposes exactly
//! the surface the agent consumes: content blocks addressed by opaque handles,
//! the per-block processed marker, and the interaction slot that injected nodes
//! are prepended into. A wasm host implements it over `web_sys`; tests and
//! headless hosts use [`MemoryDocument`].

pub mod memory;

use postvotes_protocol::VoteDirection;

pub use memory::{MemoryDocument, MemoryNode};

/// Opaque handle to a host content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementHandle(pub u64);

/// Opaque handle to a node injected by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u64);

/// What an injected node is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
	/// Vote control for one direction.
	Control(VoteDirection),
	/// Score display.
	Score,
	/// Bullet separator.
	Separator,
}

/// Description of a node to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
	/// Node purpose.
	pub role: NodeRole,
	/// Text content.
	pub text: String,
	/// Hover title.
	pub title: Option<String>,
	/// Initial active state (controls only).
	pub active: bool,
}

impl NodeSpec {
	/// Vote control for `direction`.
	pub fn control(direction: VoteDirection, active: bool) -> Self {
		Self {
			role: NodeRole::Control(direction),
			text: String::new(),
			title: Some(direction.label().to_owned()),
			active,
		}
	}

	/// Score display showing `score`.
	pub fn score(score: i64) -> Self {
		Self {
			role: NodeRole::Score,
			text: score.to_string(),
			title: Some("Score".to_owned()),
			active: false,
		}
	}

	/// Bullet separator.
	pub fn separator() -> Self {
		Self {
			role: NodeRole::Separator,
			text: "\u{2022}".to_owned(),
			title: None,
			active: false,
		}
	}
}

/// The part of a host page the agent reads and mutates.
///
/// Implementations must tolerate stale handles (a block the host re-rendered
/// away): operations on unknown handles are no-ops.
pub trait HostDocument: Send + 'static {
	/// Content blocks without the processed marker, in document order.
	fn unprocessed_blocks(&self) -> Vec<ElementHandle>;

	/// Content blocks carrying the processed marker.
	fn processed_blocks(&self) -> Vec<ElementHandle>;

	/// Identifier attribute of a block.
	fn element_id(&self, element: ElementHandle) -> Option<String>;

	/// Sets or clears the processed marker.
	fn set_processed(&mut self, element: ElementHandle, processed: bool);

	/// Prepends a node into the block's interaction slot.
	///
	/// Returns `None` when the block has no interaction slot at the expected
	/// structural path.
	fn prepend(&mut self, element: ElementHandle, spec: NodeSpec) -> Option<NodeHandle>;

	/// Removes an injected node.
	fn remove(&mut self, node: NodeHandle);

	/// Replaces a node's text.
	fn set_text(&mut self, node: NodeHandle, text: &str);

	/// Sets a control's active visual state.
	fn set_active(&mut self, node: NodeHandle, active: bool);

	/// Adds or removes the disabled marker, with an optional tooltip.
	fn set_disabled(&mut self, node: NodeHandle, disabled: bool, tooltip: Option<&str>);

	/// Shows a blocking notice to the user.
	fn show_notice(&mut self, message: &str);
}
