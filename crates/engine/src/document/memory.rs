//! Headless [`HostDocument`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ElementHandle, HostDocument, NodeHandle, NodeRole, NodeSpec};

/// Snapshot of one injected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNode {
	/// Block the node was injected into.
	pub element: ElementHandle,
	/// Node purpose.
	pub role: NodeRole,
	/// Text content.
	pub text: String,
	/// Hover title; replaced by the tooltip while disabled.
	pub title: Option<String>,
	/// Active visual state.
	pub active: bool,
	/// Disabled marker.
	pub disabled: bool,
}

#[derive(Debug)]
struct Block {
	handle: ElementHandle,
	id: String,
	processed: bool,
	slot: Option<Vec<NodeHandle>>,
	title_before_disable: HashMap<NodeHandle, Option<String>>,
}

#[derive(Debug, Default)]
struct State {
	next_handle: u64,
	blocks: Vec<Block>,
	nodes: HashMap<NodeHandle, MemoryNode>,
	notices: Vec<String>,
}

impl State {
	fn next(&mut self) -> u64 {
		self.next_handle += 1;
		self.next_handle
	}

	fn block(&self, element: ElementHandle) -> Option<&Block> {
		self.blocks.iter().find(|b| b.handle == element)
	}

	fn block_mut(&mut self, element: ElementHandle) -> Option<&mut Block> {
		self.blocks.iter_mut().find(|b| b.handle == element)
	}
}

/// In-memory page of content blocks.
///
/// Clones share the same page, so a host or test keeps a view while the engine
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
	state: Arc<Mutex<State>>,
}

impl MemoryDocument {
	/// Creates an empty page.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a content block with an interaction slot.
	pub fn add_block(&self, id: impl Into<String>) -> ElementHandle {
		self.push_block(id.into(), true)
	}

	/// Appends a content block whose markup lacks the interaction slot.
	pub fn add_block_without_slot(&self, id: impl Into<String>) -> ElementHandle {
		self.push_block(id.into(), false)
	}

	fn push_block(&self, id: String, with_slot: bool) -> ElementHandle {
		let mut state = self.state.lock();
		let handle = ElementHandle(state.next());
		state.blocks.push(Block {
			handle,
			id,
			processed: false,
			slot: with_slot.then(Vec::new),
			title_before_disable: HashMap::new(),
		});
		handle
	}

	/// Whether a block carries the processed marker.
	pub fn is_processed(&self, element: ElementHandle) -> bool {
		self.state.lock().block(element).is_some_and(|b| b.processed)
	}

	/// Nodes in a block's interaction slot, front to back.
	pub fn slot_nodes(&self, element: ElementHandle) -> Vec<MemoryNode> {
		let state = self.state.lock();
		state
			.block(element)
			.and_then(|b| b.slot.as_ref())
			.map(|slot| slot.iter().filter_map(|n| state.nodes.get(n).cloned()).collect())
			.unwrap_or_default()
	}

	/// First injected node with `role` in a block.
	pub fn find_node(&self, element: ElementHandle, role: NodeRole) -> Option<(NodeHandle, MemoryNode)> {
		let state = self.state.lock();
		let slot = state.block(element)?.slot.as_ref()?;
		slot.iter()
			.find_map(|h| state.nodes.get(h).filter(|n| n.role == role).map(|n| (*h, n.clone())))
	}

	/// Snapshot of one node.
	pub fn node(&self, node: NodeHandle) -> Option<MemoryNode> {
		self.state.lock().nodes.get(&node).cloned()
	}

	/// Total number of injected nodes on the page.
	pub fn injected_count(&self) -> usize {
		self.state.lock().nodes.len()
	}

	/// Number of blocks carrying the processed marker.
	pub fn processed_count(&self) -> usize {
		self.state.lock().blocks.iter().filter(|b| b.processed).count()
	}

	/// Notices shown so far.
	pub fn notices(&self) -> Vec<String> {
		self.state.lock().notices.clone()
	}
}

impl HostDocument for MemoryDocument {
	fn unprocessed_blocks(&self) -> Vec<ElementHandle> {
		self.state.lock().blocks.iter().filter(|b| !b.processed).map(|b| b.handle).collect()
	}

	fn processed_blocks(&self) -> Vec<ElementHandle> {
		self.state.lock().blocks.iter().filter(|b| b.processed).map(|b| b.handle).collect()
	}

	fn element_id(&self, element: ElementHandle) -> Option<String> {
		self.state.lock().block(element).map(|b| b.id.clone())
	}

	fn set_processed(&mut self, element: ElementHandle, processed: bool) {
		if let Some(block) = self.state.lock().block_mut(element) {
			block.processed = processed;
		}
	}

	fn prepend(&mut self, element: ElementHandle, spec: NodeSpec) -> Option<NodeHandle> {
		let mut state = self.state.lock();
		let handle = NodeHandle(state.next());
		state.block_mut(element)?.slot.as_mut()?.insert(0, handle);
		state.nodes.insert(
			handle,
			MemoryNode {
				element,
				role: spec.role,
				text: spec.text,
				title: spec.title,
				active: spec.active,
				disabled: false,
			},
		);
		Some(handle)
	}

	fn remove(&mut self, node: NodeHandle) {
		let mut state = self.state.lock();
		let Some(removed) = state.nodes.remove(&node) else {
			return;
		};
		if let Some(block) = state.block_mut(removed.element) {
			if let Some(slot) = block.slot.as_mut() {
				slot.retain(|h| *h != node);
			}
			block.title_before_disable.remove(&node);
		}
	}

	fn set_text(&mut self, node: NodeHandle, text: &str) {
		if let Some(n) = self.state.lock().nodes.get_mut(&node) {
			n.text = text.to_owned();
		}
	}

	fn set_active(&mut self, node: NodeHandle, active: bool) {
		if let Some(n) = self.state.lock().nodes.get_mut(&node) {
			n.active = active;
		}
	}

	fn set_disabled(&mut self, node: NodeHandle, disabled: bool, tooltip: Option<&str>) {
		let mut state = self.state.lock();
		let Some(n) = state.nodes.get_mut(&node) else {
			return;
		};
		let element = n.element;
		let was_disabled = n.disabled;
		let previous_title = n.title.clone();
		n.disabled = disabled;

		let Some(block) = state.block_mut(element) else {
			return;
		};
		let restored = if disabled {
			if !was_disabled {
				block.title_before_disable.insert(node, previous_title);
			}
			tooltip.map(str::to_owned)
		} else {
			block.title_before_disable.remove(&node).unwrap_or(previous_title)
		};
		if let Some(n) = state.nodes.get_mut(&node) {
			n.title = restored;
		}
	}

	fn show_notice(&mut self, message: &str) {
		self.state.lock().notices.push(message.to_owned());
	}
}
