use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonRequest {
	Ping,
	/// Bind this connection to the panel's lifetime; its close triggers the
	/// session sweep.
	Attach,
	/// Track a remote session owned by the attached panel.
	RegisterSession {
		#[serde(default)]
		session_id: String,
	},
	/// Release a session now and stop tracking it on success.
	/// A missing or empty id is tolerated as a no-op; callers are not
	/// required to validate first.
	ClearSession {
		#[serde(default)]
		session_id: String,
	},
	ListSessions,
	Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonResponse {
	Pong,
	Ok,
	Sessions { list: Vec<SessionInfo> },
	Error { code: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
	pub session_id: String,
	/// Seconds since the session was registered.
	pub age_secs: u64,
}
