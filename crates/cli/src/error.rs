use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, SkError>;

#[derive(Debug, Error)]
pub enum SkError {
	#[error("daemon error: {0}")]
	Daemon(String),

	#[error("another panel is already attached to the daemon")]
	PanelAttached,

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Client(#[from] sidekick_client::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl SkError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, message) = match self {
			SkError::Daemon(msg) => (ErrorCode::DaemonError, msg.clone()),
			SkError::PanelAttached => (ErrorCode::SessionError, self.to_string()),
			SkError::InvalidInput(msg) => (ErrorCode::InvalidInput, msg.clone()),
			SkError::Client(err) => {
				let code = if err.is_transport() {
					ErrorCode::RemoteUnreachable
				} else {
					ErrorCode::RemoteRejected
				};
				(code, err.to_string())
			}
			SkError::Io(err) => (ErrorCode::IoError, err.to_string()),
			SkError::Json(err) => (ErrorCode::InternalError, format!("JSON error: {err}")),
			SkError::Anyhow(err) => (ErrorCode::InternalError, err.to_string()),
		};

		CommandError {
			code,
			message,
			details: None,
		}
	}
}
