use serde_json::json;
use sidekick_client::RemoteClient;

use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub async fn execute(base_url: &str, format: OutputFormat) -> Result<()> {
	let remote = RemoteClient::new(base_url)?;
	let health = remote.health().await?;

	let result = ResultBuilder::new("health")
		.data(json!({
			"status": health.status,
			"active_sessions": health.active_sessions
		}))
		.build();
	print_result(&result, format);
	Ok(())
}
