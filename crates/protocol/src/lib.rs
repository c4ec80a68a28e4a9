//! Wire vocabulary for the post voting channel.
//!
//! This crate defines everything that crosses the real-time channel between the
//! page agent and the voting server:
//! * [`EntityRef`]: `(kind, id)` pairs derived from host element identifiers
//! * [`VoteDirection`]: the two directions a user can vote in
//! * [`wire`]: request, acknowledgement and push payloads
//! * [`ServerEvent`]: the closed set of events the agent reacts to

#![warn(missing_docs)]

pub mod entity;
pub mod error;
pub mod event;
pub mod vote;
pub mod wire;

pub use entity::{EntityKind, EntityRef};
pub use error::{ProtocolError, Result};
pub use event::{ClientEvent, PushEvent, ServerEvent, names};
pub use vote::{UserId, VoteDirection};
