//! Error types for decoding channel traffic.

use thiserror::Error;

/// Errors produced while interpreting channel traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
	/// The server sent an event name the agent does not understand.
	#[error("unknown event: {0}")]
	UnknownEvent(String),

	/// A known event carried a payload of the wrong shape.
	#[error("malformed '{event}' payload: {source}")]
	Payload {
		/// Event name the payload belonged to.
		event: String,
		/// The underlying decode error.
		#[source]
		source: serde_json::Error,
	},

	/// An entity key did not follow the `<kind>_<digits>` convention.
	#[error("invalid entity key: {0}")]
	InvalidEntityKey(String),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
