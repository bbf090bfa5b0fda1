//! Wire types for the sidekick assist service.
//!
//! The assist service owns all reasoning state; sidekick only consumes its
//! HTTP surface. These types mirror that surface exactly and carry no
//! behavior beyond serde.

pub mod assist;

pub use assist::{
	AskReply, AskRequest, CreatePageRequest, CreateSessionResponse, CreateVideoRequest,
	HealthResponse, PageContent,
};
