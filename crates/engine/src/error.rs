//! Error types for the page agent.

use thiserror::Error;

/// Errors surfaced by the engine and its collaborators.
///
/// None of these reach the host page: the engine logs them and keeps the page
/// functional with voting simply absent.
#[derive(Debug, Error)]
pub enum Error {
	/// The host page reports no signed-in user.
	#[error("not signed in")]
	NotSignedIn,

	/// The profile page did not contain an extractable API key.
	#[error("API key missing from profile page")]
	CredentialMissing,

	/// The server declined the credential.
	#[error("authentication rejected by server")]
	AuthRejected,

	/// The channel refused an operation.
	#[error("channel error: {0}")]
	Channel(String),

	/// The persistent store failed.
	#[error("store error: {0}")]
	Store(String),

	/// Fetching a host page resource failed.
	#[error("fetch of {path} failed: {reason}")]
	Fetch {
		/// Requested path.
		path: String,
		/// Failure description.
		reason: String,
	},

	/// Channel traffic could not be interpreted.
	#[error(transparent)]
	Protocol(#[from] postvotes_protocol::ProtocolError),

	/// JSON encoding or decoding failed.
	#[error(transparent)]
	Json(#[from] serde_json::Error),

	/// The engine task has exited.
	#[error("engine stopped")]
	EngineStopped,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
