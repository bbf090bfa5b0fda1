use std::path::PathBuf;

use anyhow::anyhow;
use serde_json::json;
use sidekick_client::RemoteClient;

use crate::daemon::{self, Coordinator};
use crate::error::{Result, SkError};
use crate::output::{OutputFormat, ResultBuilder, print_result};

/// Get the daemon PID file path for the current user.
///
/// Uses XDG runtime directory when available and falls back to temp dir.
#[cfg(unix)]
fn daemon_pid_path() -> PathBuf {
	if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
		return PathBuf::from(xdg_runtime).join("sk-daemon.pid");
	}
	std::env::temp_dir().join("sk-daemon.pid")
}

#[cfg(unix)]
fn read_pid_file(path: &std::path::Path) -> Option<u32> {
	std::fs::read_to_string(path).ok()?.trim().parse::<u32>().ok()
}

pub async fn start(base_url: &str, foreground: bool, format: OutputFormat) -> Result<()> {
	if foreground {
		if matches!(daemon::ping().await?, Some(true)) {
			return Err(SkError::Daemon(
				"daemon already running; use `sk daemon status` or `sk daemon stop`".to_string(),
			));
		}

		let remote = RemoteClient::new(base_url)?;
		let coordinator = Coordinator::start(remote).await?;
		let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
		let run_task = tokio::spawn(async move { coordinator.run_with_ready(Some(ready_tx)).await });

		if ready_rx.await.is_err() {
			run_task
				.await
				.map_err(|e| SkError::Anyhow(anyhow!("Daemon task join failed before startup: {e}")))??;
			return Err(SkError::Anyhow(anyhow!("Daemon exited before reporting startup readiness")));
		}

		let result = ResultBuilder::new("daemon start")
			.data(json!({
				"started": true,
				"foreground": true
			}))
			.build();
		print_result(&result, format);

		run_task.await.map_err(|e| SkError::Anyhow(anyhow!("Daemon task join failed: {e}")))??;
		return Ok(());
	}

	#[cfg(windows)]
	{
		return Err(SkError::Daemon(
			"Background daemon mode is not available on Windows; use --foreground".to_string(),
		));
	}

	#[cfg(unix)]
	{
		let pid_path = daemon_pid_path();
		if matches!(daemon::ping().await?, Some(true)) {
			let result = ResultBuilder::new("daemon start")
				.data(json!({
					"started": false,
					"running": true,
					"already_running": true,
					"foreground": false,
					"pid_file": pid_path.display().to_string(),
					"pid": read_pid_file(&pid_path),
					"message": "daemon already running"
				}))
				.build();
			print_result(&result, format);
			return Ok(());
		}

		let child_pid = spawn_background(base_url).await?;

		if let Some(parent) = pid_path.parent() {
			let _ = std::fs::create_dir_all(parent);
		}
		std::fs::write(&pid_path, child_pid.to_string())?;

		let result = ResultBuilder::new("daemon start")
			.data(json!({
				"started": true,
				"running": true,
				"foreground": false,
				"pid_file": pid_path.display().to_string(),
				"pid": child_pid
			}))
			.build();
		print_result(&result, format);

		Ok(())
	}
}

/// Spawn the daemon as a detached child process and wait for it to answer.
///
/// Spawning a new process rather than forking avoids issues with the tokio
/// runtime after fork and keeps stdio working.
#[cfg(unix)]
pub(crate) async fn spawn_background(base_url: &str) -> Result<u32> {
	let exe = std::env::current_exe()
		.map_err(|e| SkError::Anyhow(anyhow!("Failed to get executable path: {e}")))?;

	let child = std::process::Command::new(&exe)
		.arg("daemon")
		.arg("start")
		.arg("--foreground")
		.arg("--base-url")
		.arg(base_url)
		.stdin(std::process::Stdio::null())
		.stdout(std::process::Stdio::null())
		.stderr(std::process::Stdio::null())
		.spawn()
		.map_err(|e| SkError::Anyhow(anyhow!("Failed to spawn daemon: {e}")))?;

	// Wait a bit for daemon to start.
	for _ in 0..10 {
		tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
		if matches!(daemon::ping().await?, Some(true)) {
			return Ok(child.id());
		}
	}

	Err(SkError::Anyhow(anyhow!("Daemon failed to start")))
}

/// Make sure a daemon is answering, spawning one in the background if needed.
pub(crate) async fn ensure_running(base_url: &str) -> Result<()> {
	if matches!(daemon::ping().await?, Some(true)) {
		return Ok(());
	}

	#[cfg(unix)]
	{
		spawn_background(base_url).await?;
		Ok(())
	}

	#[cfg(windows)]
	{
		let _ = base_url;
		Err(SkError::Daemon(
			"daemon not running; start it with `sk daemon start --foreground`".to_string(),
		))
	}
}

pub async fn stop(format: OutputFormat) -> Result<()> {
	match daemon::shutdown().await? {
		None => {
			let result = ResultBuilder::new("daemon stop")
				.data(json!({
					"stopped": false,
					"message": "daemon not running"
				}))
				.build();
			print_result(&result, format);
			Ok(())
		}
		Some(()) => {
			#[cfg(unix)]
			{
				let _ = std::fs::remove_file(daemon_pid_path());
			}
			let result = ResultBuilder::new("daemon stop").data(json!({ "stopped": true })).build();
			print_result(&result, format);
			Ok(())
		}
	}
}

pub async fn status(format: OutputFormat) -> Result<()> {
	let Some(true) = daemon::ping().await? else {
		let result = ResultBuilder::new("daemon status")
			.data(json!({
				"running": false,
				"message": "daemon not running"
			}))
			.build();
		print_result(&result, format);
		return Ok(());
	};

	let list = daemon::list_sessions().await?.unwrap_or_default();
	let result = ResultBuilder::new("daemon status")
		.data(json!({
			"running": true,
			"sessions": list
		}))
		.build();
	print_result(&result, format);
	Ok(())
}
