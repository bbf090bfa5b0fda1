//! HTTP adapter for the sidekick assist service.
//!
//! [`RemoteClient`] wraps the service's small HTTP surface: session creation
//! from page or video content, chat turns, a health probe, and session
//! release. It holds no state beyond the HTTP client and base URL; all
//! session bookkeeping lives with the caller.

mod error;
mod remote;
mod video;

pub use error::{Error, Result};
pub use remote::{RemoteClient, DEFAULT_BASE_URL};
pub use video::youtube_video_id;
