mod protocol;
mod registry;
mod server;

use anyhow::{Context, Result, anyhow};
pub use protocol::{DaemonRequest, DaemonResponse, SessionInfo};
pub use server::Coordinator;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(windows)]
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

pub const DAEMON_TCP_PORT: u16 = 19555;

/// Returns the daemon socket path for the current user.
///
/// Uses `$XDG_RUNTIME_DIR/sk-daemon.sock` if available (already
/// user-permissioned), otherwise falls back to `/tmp/sk-daemon-{uid}.sock`.
#[cfg(unix)]
pub fn daemon_socket_path() -> std::path::PathBuf {
	use std::path::PathBuf;

	if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
		return PathBuf::from(xdg_runtime).join("sk-daemon.sock");
	}

	let uid = unsafe { libc::getuid() };
	PathBuf::from(format!("/tmp/sk-daemon-{uid}.sock"))
}

#[cfg(unix)]
type DaemonStream = UnixStream;
#[cfg(windows)]
type DaemonStream = TcpStream;

/// Pings the daemon. `None` means it is not running.
pub async fn ping() -> Result<Option<bool>> {
	let stream = match connect_daemon().await {
		Ok(stream) => stream,
		Err(err) if is_not_running(&err) => return Ok(None),
		Err(err) => return Err(err).context("Failed to connect to daemon"),
	};

	let response = send_request_stream(stream, DaemonRequest::Ping).await?;
	Ok(Some(matches!(response, DaemonResponse::Pong)))
}

/// Lists sessions tracked by the daemon. `None` means it is not running.
pub async fn list_sessions() -> Result<Option<Vec<SessionInfo>>> {
	let Some(response) = send_request_if_running(DaemonRequest::ListSessions).await? else {
		return Ok(None);
	};

	match response {
		DaemonResponse::Sessions { list } => Ok(Some(list)),
		DaemonResponse::Error { code, message } => Err(anyhow!("daemon error {code}: {message}")),
		other => Err(anyhow!("unexpected daemon response: {other:?}")),
	}
}

/// Asks the daemon to shut down. `None` means it was not running.
pub async fn shutdown() -> Result<Option<()>> {
	let Some(response) = send_request_if_running(DaemonRequest::Shutdown).await? else {
		return Ok(None);
	};

	match response {
		DaemonResponse::Ok => Ok(Some(())),
		DaemonResponse::Error { code, message } => Err(anyhow!("daemon error {code}: {message}")),
		other => Err(anyhow!("unexpected daemon response: {other:?}")),
	}
}

/// A panel's live connection to the daemon.
///
/// The connection itself is the ownership signal: after [`attach`], every
/// session registered through this link is swept by the daemon the moment
/// the link drops, whether the panel exited cleanly or crashed.
pub struct PanelLink {
	stream: BufReader<DaemonStream>,
}

impl PanelLink {
	/// Connects to the daemon. `None` means it is not running.
	pub async fn connect() -> Result<Option<Self>> {
		match connect_daemon().await {
			Ok(stream) => Ok(Some(Self {
				stream: BufReader::new(stream),
			})),
			Err(err) if is_not_running(&err) => Ok(None),
			Err(err) => Err(err).context("Failed to connect to daemon"),
		}
	}

	/// Binds this connection to the panel lifetime. The caller interprets
	/// the response (`panel_attached` means another panel holds the slot).
	pub async fn attach(&mut self) -> Result<DaemonResponse> {
		self.request(DaemonRequest::Attach).await
	}

	pub async fn register_session(&mut self, session_id: &str) -> Result<()> {
		let response = self
			.request(DaemonRequest::RegisterSession {
				session_id: session_id.to_string(),
			})
			.await?;
		expect_ok(response)
	}

	pub async fn clear_session(&mut self, session_id: &str) -> Result<()> {
		let response = self
			.request(DaemonRequest::ClearSession {
				session_id: session_id.to_string(),
			})
			.await?;
		expect_ok(response)
	}

	async fn request(&mut self, request: DaemonRequest) -> Result<DaemonResponse> {
		let payload = serde_json::to_string(&request).context("Failed to serialize daemon request")?;
		let stream = self.stream.get_mut();
		stream
			.write_all(format!("{}\n", payload).as_bytes())
			.await
			.context("Failed writing daemon request")?;
		stream.flush().await.context("Failed flushing daemon request")?;

		let mut line = String::new();
		self.stream
			.read_line(&mut line)
			.await
			.context("Failed reading daemon response")?;
		serde_json::from_str(&line).context("Failed parsing daemon response")
	}
}

fn expect_ok(response: DaemonResponse) -> Result<()> {
	match response {
		DaemonResponse::Ok => Ok(()),
		DaemonResponse::Error { code, message } => Err(anyhow!("daemon error {code}: {message}")),
		other => Err(anyhow!("unexpected daemon response: {other:?}")),
	}
}

async fn send_request_if_running(request: DaemonRequest) -> Result<Option<DaemonResponse>> {
	let stream = match connect_daemon().await {
		Ok(stream) => stream,
		Err(err) if is_not_running(&err) => return Ok(None),
		Err(err) => return Err(err).context("Failed to connect to daemon"),
	};
	Ok(Some(send_request_stream(stream, request).await?))
}

#[cfg(unix)]
async fn connect_daemon() -> std::io::Result<UnixStream> {
	UnixStream::connect(daemon_socket_path()).await
}

#[cfg(windows)]
async fn connect_daemon() -> std::io::Result<TcpStream> {
	TcpStream::connect(("127.0.0.1", DAEMON_TCP_PORT)).await
}

fn is_not_running(err: &std::io::Error) -> bool {
	matches!(
		err.kind(),
		std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
	)
}

async fn send_request_stream<S>(mut stream: S, request: DaemonRequest) -> Result<DaemonResponse>
where
	S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
	let payload = serde_json::to_string(&request).context("Failed to serialize daemon request")?;
	stream
		.write_all(format!("{}\n", payload).as_bytes())
		.await
		.context("Failed writing daemon request")?;
	stream
		.flush()
		.await
		.context("Failed flushing daemon request")?;

	let mut reader = BufReader::new(stream);
	let mut line = String::new();
	reader
		.read_line(&mut line)
		.await
		.context("Failed reading daemon response")?;
	let response = serde_json::from_str(&line).context("Failed parsing daemon response")?;
	Ok(response)
}
