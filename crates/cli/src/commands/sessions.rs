use serde_json::json;

use crate::daemon;
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub async fn execute(format: OutputFormat) -> Result<()> {
	match daemon::list_sessions().await? {
		None => {
			let result = ResultBuilder::new("sessions")
				.data(json!({
					"running": false,
					"message": "daemon not running"
				}))
				.build();
			print_result(&result, format);
			Ok(())
		}
		Some(list) => {
			let result = ResultBuilder::new("sessions")
				.data(json!({
					"running": true,
					"count": list.len(),
					"sessions": list
				}))
				.build();
			print_result(&result, format);
			Ok(())
		}
	}
}
