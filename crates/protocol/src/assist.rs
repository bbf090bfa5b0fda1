//! Request/response types for the remote assist service.
//!
//! The service exposes a small HTTP surface:
//!
//! 1. A panel creates a session from page or video content
//!    ([`CreatePageRequest`] / [`CreateVideoRequest`] → [`CreateSessionResponse`])
//! 2. Chat turns are exchanged against that session
//!    ([`AskRequest`] → [`AskReply`])
//! 3. The session is eventually released via `DELETE /clear/{session_id}`
//!    (no body either way; only the status code matters)
//!
//! Field naming follows the service: request/response payloads use camelCase
//! keys, except the health probe which reports snake_case counters.

use serde::{Deserialize, Serialize};

/// Content captured from a host document, as supplied by a panel.
///
/// Extraction itself happens on the panel side; the service receives the
/// already-flattened text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
	/// Document title.
	pub title: String,
	/// Canonical URL of the document.
	pub url: String,
	/// Extracted body text.
	pub content: String,
	/// Meta description, empty when the document has none.
	#[serde(default)]
	pub description: String,
}

/// Body for `POST /page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
	pub page_data: PageContent,
}

/// Body for `POST /youtube`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
	pub video_id: String,
}

/// Response for both session-creation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
	#[serde(default)]
	pub success: bool,
	/// Opaque session handle; the only token later requests need.
	pub session_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// Body for `POST /ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
	pub session_id: String,
	pub message: String,
}

/// Response for `POST /ask`.
///
/// Panels only need `reply`; the remaining fields echo which kind of context
/// answered and are informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskReply {
	pub reply: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub video_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_title: Option<String>,
}

/// Response for `GET /health`.
///
/// The service reports this endpoint in snake_case, unlike the rest of its
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	#[serde(default)]
	pub active_sessions: u64,
}
