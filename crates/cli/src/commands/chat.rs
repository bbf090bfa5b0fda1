//! The panel itself: create a remote session, hand its lifetime to the
//! daemon, exchange chat turns, clean up on the way out.

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde_json::json;
use sidekick_client::{RemoteClient, youtube_video_id};
use sidekick_protocol::PageContent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::daemon::ensure_running;
use crate::daemon::{DaemonResponse, PanelLink};
use crate::error::{Result, SkError};
use crate::output::{OutputFormat, ResultBuilder, print_result};

struct PanelSession {
	remote: RemoteClient,
	session_id: String,
	/// Live daemon connection; `None` when running with --no-daemon.
	link: Option<PanelLink>,
}

pub async fn chat(
	base_url: &str,
	no_daemon: bool,
	url: &str,
	content_file: Option<&Path>,
	title: Option<&str>,
) -> Result<()> {
	if youtube_video_id(url).is_none() && content_file.is_none() {
		return Err(SkError::InvalidInput(
			"interactive chat needs --content-file for page URLs (stdin is reserved for the conversation)"
				.to_string(),
		));
	}

	let mut session = open_session(base_url, no_daemon, url, content_file, title).await?;

	println!(
		"{}",
		format!("session {} ready, ask away (ctrl-d to end)", session.session_id).dimmed()
	);

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		print!("{} ", "you>".cyan().bold());
		std::io::stdout().flush()?;

		let Some(line) = lines.next_line().await? else {
			println!();
			break;
		};
		let message = line.trim();
		if message.is_empty() {
			continue;
		}
		if message == "/quit" || message == "/exit" {
			break;
		}

		match session.remote.ask(&session.session_id, message).await {
			Ok(reply) => println!("{} {}", "sidekick>".green().bold(), reply.reply),
			Err(err) => eprintln!("{} {}", "error:".red().bold(), err),
		}
	}

	close_session(&mut session).await;
	Ok(())
}

pub async fn ask_once(
	base_url: &str,
	no_daemon: bool,
	url: &str,
	question: &str,
	content_file: Option<&Path>,
	title: Option<&str>,
	format: OutputFormat,
) -> Result<()> {
	let mut session = open_session(base_url, no_daemon, url, content_file, title).await?;

	let outcome = session.remote.ask(&session.session_id, question).await;
	close_session(&mut session).await;
	let reply = outcome?;

	let result = ResultBuilder::new("ask")
		.data(json!({
			"reply": reply.reply,
			"context": reply.context,
		}))
		.build();
	print_result(&result, format);
	Ok(())
}

/// Creates the remote session and, unless --no-daemon, binds it to a live
/// daemon connection so it gets swept if this process dies.
async fn open_session(
	base_url: &str,
	no_daemon: bool,
	url: &str,
	content_file: Option<&Path>,
	title: Option<&str>,
) -> Result<PanelSession> {
	let remote = RemoteClient::new(base_url)?;

	let session_id = if let Some(video_id) = youtube_video_id(url) {
		debug!(target = "sk.chat", video = %video_id, "creating video session");
		remote.create_video_session(&video_id).await?
	} else {
		let content = read_content(content_file)?;
		let page = PageContent {
			title: title.unwrap_or(url).to_string(),
			url: url.to_string(),
			content,
			description: String::new(),
		};
		remote.create_page_session(page).await?
	};
	debug!(target = "sk.chat", session = %session_id, "session created");

	let link = if no_daemon {
		None
	} else {
		ensure_running(base_url).await?;
		let mut link = PanelLink::connect()
			.await?
			.ok_or_else(|| SkError::Daemon("daemon not answering after startup".to_string()))?;

		match link.attach().await? {
			DaemonResponse::Ok => {}
			DaemonResponse::Error { ref code, .. } if code == "panel_attached" => {
				// Nobody will ever sweep this session, so try to release it
				// before bailing out.
				if let Err(err) = remote.release(&session_id).await {
					warn!(target = "sk.chat", session = %session_id, error = %err, "failed to release orphaned session");
				}
				return Err(SkError::PanelAttached);
			}
			other => {
				return Err(SkError::Daemon(format!("unexpected attach response: {other:?}")));
			}
		}
		link.register_session(&session_id).await?;
		Some(link)
	};

	Ok(PanelSession {
		remote,
		session_id,
		link,
	})
}

/// Best-effort cleanup on a clean exit. With a daemon link the clear request
/// is acknowledged as "accepted" regardless of remote outcome; without one
/// we talk to the assist service directly.
async fn close_session(session: &mut PanelSession) {
	if let Some(link) = session.link.as_mut() {
		if let Err(err) = link.clear_session(&session.session_id).await {
			warn!(target = "sk.chat", session = %session.session_id, error = %err, "failed to request session clear");
		}
	} else if let Err(err) = session.remote.release(&session.session_id).await {
		warn!(target = "sk.chat", session = %session.session_id, error = %err, "failed to release session");
	}
}

fn read_content(content_file: Option<&Path>) -> Result<String> {
	let content = match content_file {
		Some(path) => std::fs::read_to_string(path)?,
		None => {
			use std::io::Read;
			let mut buf = String::new();
			std::io::stdin().read_to_string(&mut buf)?;
			buf
		}
	};

	if content.trim().is_empty() {
		return Err(SkError::InvalidInput(
			"page content is empty; pass --content-file or pipe text on stdin".to_string(),
		));
	}
	Ok(content)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn read_content_loads_file() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("page.txt");
		std::fs::write(&path, "some page text").unwrap();

		let content = read_content(Some(&path)).unwrap();
		assert_eq!(content, "some page text");
	}

	#[test]
	fn read_content_rejects_blank_file() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("empty.txt");
		std::fs::write(&path, "  \n\t").unwrap();

		let err = read_content(Some(&path)).unwrap_err();
		assert!(matches!(err, SkError::InvalidInput(_)));
	}

	#[test]
	fn read_content_errors_for_missing_file() {
		let err = read_content(Some(Path::new("/definitely/missing/page.txt"))).unwrap_err();
		assert!(matches!(err, SkError::Io(_)));
	}
}
