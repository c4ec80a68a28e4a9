//! Bookkeeping for claimed host blocks and the nodes injected into them.
//!
//! The registry is pure bookkeeping: it never talks to the channel. It mirrors
//! every visual state it sets on the [`HostDocument`] (active, disabled) so vote
//! toggling and activation gating can be decided without reading the page back.


use std::collections::HashMap;

use postvotes_protocol::wire::VoteRequest;
use postvotes_protocol::{EntityRef, VoteDirection};

use crate::document::{ElementHandle, HostDocument, NodeHandle, NodeSpec};

/// Mirrored state of one injected vote control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
	/// Injected node.
	pub node: NodeHandle,
	/// Rendered as the user's current vote.
	pub active: bool,
	/// Rejecting activation while a lockout window is open.
	pub disabled: bool,
}

/// Client-side state bound to one claimed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredElement {
	entity: EntityRef,
	element: ElementHandle,
	score: NodeHandle,
	separator: NodeHandle,
	up: ControlState,
	down: ControlState,
}

impl RegisteredElement {
	/// Entity behind the block.
	pub fn entity(&self) -> &EntityRef {
		&self.entity
	}

	/// The claimed block.
	pub fn element(&self) -> ElementHandle {
		self.element
	}

	/// Score display node.
	pub fn score_node(&self) -> NodeHandle {
		self.score
	}

	/// Control for `direction`.
	pub fn control(&self, direction: VoteDirection) -> &ControlState {
		match direction {
			VoteDirection::Up => &self.up,
			VoteDirection::Down => &self.down,
		}
	}

	fn control_mut(&mut self, direction: VoteDirection) -> &mut ControlState {
		match direction {
			VoteDirection::Up => &mut self.up,
			VoteDirection::Down => &mut self.down,
		}
	}

	/// The user's vote as currently rendered.
	pub fn rendered_vote(&self) -> Option<VoteDirection> {
		VoteDirection::ALL.into_iter().find(|d| self.control(*d).active)
	}

	/// Every injected node, left to right.
	pub fn nodes(&self) -> [NodeHandle; 4] {
		[self.up.node, self.score, self.separator, self.down.node]
	}
}

/// Outcome of a control activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
	/// The node is not a registered control.
	Unknown,
	/// The control is disabled; the activation is ignored.
	Disabled,
	/// The vote intent to emit.
	Vote(VoteRequest),
}

/// Registry of claimed blocks for one session.
#[derive(Debug, Default)]
pub struct ElementRegistry {
	entries: HashMap<EntityRef, RegisteredElement>,
	by_element: HashMap<ElementHandle, EntityRef>,
	controls: HashMap<NodeHandle, (EntityRef, VoteDirection)>,
}

impl ElementRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks every unprocessed block as processed in one pass and returns the
	/// ones whose identifier names an entity.
	///
	/// Blocks with foreign identifiers stay marked so later scans skip them.
	pub fn claim_unprocessed(&mut self, document: &mut dyn HostDocument) -> Vec<(ElementHandle, EntityRef)> {
		let blocks = document.unprocessed_blocks();
		let mut claimed = Vec::with_capacity(blocks.len());
		for element in blocks {
			document.set_processed(element, true);
			let id = document.element_id(element);
			match id.as_deref().and_then(EntityRef::parse) {
				Some(entity) => claimed.push((element, entity)),
				None => tracing::trace!(element = element.0, id = ?id, "skipping block without entity identifier"),
			}
		}
		claimed
	}

	/// Injects controls for `entity` into `element`.
	///
	/// A block or entity that already has controls is left untouched apart from
	/// its vote state, which is brought in line with `vote`. Returns `None` when
	/// the block has no interaction slot.
	pub fn register(
		&mut self,
		document: &mut dyn HostDocument,
		entity: EntityRef,
		element: ElementHandle,
		score: i64,
		vote: Option<VoteDirection>,
	) -> Option<&RegisteredElement> {
		if let Some(existing) = self.by_element.get(&element).or_else(|| self.entries.contains_key(&entity).then_some(&entity)) {
			let existing = existing.clone();
			self.set_vote(document, &existing, vote);
			return self.entries.get(&existing);
		}

		// Prepending in reverse yields up, score, separator, down.
		let specs = [
			NodeSpec::control(VoteDirection::Down, vote == Some(VoteDirection::Down)),
			NodeSpec::separator(),
			NodeSpec::score(score),
			NodeSpec::control(VoteDirection::Up, vote == Some(VoteDirection::Up)),
		];
		let mut injected = Vec::with_capacity(specs.len());
		for spec in specs {
			match document.prepend(element, spec) {
				Some(node) => injected.push(node),
				None => {
					for node in injected {
						document.remove(node);
					}
					tracing::debug!(entity = %entity, "interaction slot missing, leaving block alone");
					return None;
				}
			}
		}
		let Ok([down, separator, score_node, up]) = <[NodeHandle; 4]>::try_from(injected) else {
			return None;
		};

		let registered = RegisteredElement {
			entity: entity.clone(),
			element,
			score: score_node,
			separator,
			up: ControlState {
				node: up,
				active: vote == Some(VoteDirection::Up),
				disabled: false,
			},
			down: ControlState {
				node: down,
				active: vote == Some(VoteDirection::Down),
				disabled: false,
			},
		};
		self.controls.insert(up, (entity.clone(), VoteDirection::Up));
		self.controls.insert(down, (entity.clone(), VoteDirection::Down));
		self.by_element.insert(element, entity.clone());
		tracing::trace!(entity = %entity, score, vote = ?vote, "registered element");
		Some(self.entries.entry(entity).or_insert(registered))
	}

	/// Removes every injected node, forgets every entry and strips the
	/// processed marker from every block, restoring the page.
	pub fn unregister_all(&mut self, document: &mut dyn HostDocument) {
		for (_, entry) in self.entries.drain() {
			for node in entry.nodes() {
				document.remove(node);
			}
		}
		self.by_element.clear();
		self.controls.clear();
		for element in document.processed_blocks() {
			document.set_processed(element, false);
		}
	}

	/// Entry for `entity`.
	pub fn get(&self, entity: &EntityRef) -> Option<&RegisteredElement> {
		self.entries.get(entity)
	}

	/// Visits every entry.
	pub fn for_each_registered(&self, f: impl FnMut(&RegisteredElement)) {
		self.entries.values().for_each(f);
	}

	/// Number of registered entities.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Overwrites the displayed score. Returns false for unknown entities.
	pub fn set_score(&mut self, document: &mut dyn HostDocument, entity: &EntityRef, score: i64) -> bool {
		let Some(entry) = self.entries.get(entity) else {
			return false;
		};
		document.set_text(entry.score, &score.to_string());
		true
	}

	/// Renders `vote` as the user's vote: at most one control active.
	/// Returns false for unknown entities.
	pub fn set_vote(&mut self, document: &mut dyn HostDocument, entity: &EntityRef, vote: Option<VoteDirection>) -> bool {
		let Some(entry) = self.entries.get_mut(entity) else {
			return false;
		};
		for direction in VoteDirection::ALL {
			let control = entry.control_mut(direction);
			control.active = vote == Some(direction);
			document.set_active(control.node, control.active);
		}
		true
	}

	/// Enables or disables every registered control.
	pub fn set_disabled_all(&mut self, document: &mut dyn HostDocument, disabled: bool, tooltip: Option<&str>) {
		for entry in self.entries.values_mut() {
			for direction in VoteDirection::ALL {
				let control = entry.control_mut(direction);
				control.disabled = disabled;
				document.set_disabled(control.node, disabled, tooltip);
			}
		}
	}

	/// Decides what activating `node` means.
	pub fn activation(&self, node: NodeHandle) -> Activation {
		let Some((entity, direction)) = self.controls.get(&node) else {
			return Activation::Unknown;
		};
		let Some(control) = self.entries.get(entity).map(|e| e.control(*direction)) else {
			return Activation::Unknown;
		};
		if control.disabled {
			return Activation::Disabled;
		}
		Activation::Vote(VoteRequest::new(entity, direction.toggled(control.active)))
	}
}
