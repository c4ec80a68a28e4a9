//! Page agent that keeps injected vote controls in sync with the voting server.
//!
//! The agent runs inside a host page. It finds votable content blocks, prepends
//! score and vote controls into them, and keeps both consistent with the server
//! over a persistent channel while honoring the server's per-user vote limit.
//!
//! Everything host-specific sits behind a seam so the engine runs the same in a
//! browser and under test:
//! * [`Channel`]: the real-time transport
//! * [`PersistentStore`]: durable key-value storage
//! * [`HostDocument`]: the page's content blocks and injected nodes
//! * [`HostPage`]: signed-in indicator and same-origin fetches
//! * [`Clock`]: wall-clock time
//!
//! [`SyncEngine`] ties them together; [`MemoryChannel`], [`MemoryStore`],
//! [`MemoryDocument`] and [`ManualClock`] are in-process implementations.

#![warn(missing_docs)]

pub mod channel;
pub mod clock;
pub mod config;
pub mod credential;
pub mod document;
pub mod engine;
pub mod error;
pub mod ratelimit;
pub mod registry;
pub mod store;
mod timer;

pub use channel::{AckId, Channel, ChannelEvent, MemoryChannel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use credential::{CredentialSource, HostPage};
pub use document::{ElementHandle, HostDocument, MemoryDocument, NodeHandle};
pub use engine::{EngineHandle, EngineParts, EngineState, SyncEngine};
pub use error::{Error, Result};
pub use ratelimit::{LockState, RateLimitScheduler, RateLimitWindow};
pub use registry::{Activation, ElementRegistry, RegisteredElement};
pub use store::{MemoryStore, PersistentStore};
