use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use sidekick_client::RemoteClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(windows)]
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, info, warn};

#[cfg(windows)]
use super::DAEMON_TCP_PORT;
#[cfg(unix)]
use super::daemon_socket_path;
use super::protocol::{DaemonRequest, DaemonResponse};
use super::registry::SessionRegistry;

struct CoordinatorState {
	registry: SessionRegistry,
	remote: RemoteClient,
	/// Whether some connection currently holds the panel attach slot.
	panel_attached: bool,
}

/// The session lifecycle coordinator.
///
/// Outlives any single panel instance. Tracks which assist-service sessions
/// are owned by the open panel and releases them remotely when the panel's
/// connection closes, however it closes.
pub struct Coordinator {
	state: Arc<Mutex<CoordinatorState>>,
	shutdown_tx: watch::Sender<bool>,
	shutdown_rx: watch::Receiver<bool>,
	#[cfg(unix)]
	listener: UnixListener,
	#[cfg(windows)]
	listener: TcpListener,
}

impl Coordinator {
	#[cfg(unix)]
	pub async fn start(remote: RemoteClient) -> Result<Self> {
		Self::bind(&daemon_socket_path(), remote).await
	}

	/// Binds the coordinator to an explicit socket path.
	#[cfg(unix)]
	pub async fn bind(socket_path: &std::path::Path, remote: RemoteClient) -> Result<Self> {
		if socket_path.exists() {
			std::fs::remove_file(socket_path).with_context(|| {
				format!(
					"Failed to remove existing socket: {}",
					socket_path.display()
				)
			})?;
		}
		// Ensure parent directory exists (for XDG_RUNTIME_DIR fallback)
		if let Some(parent) = socket_path.parent() {
			if !parent.exists() {
				std::fs::create_dir_all(parent).with_context(|| {
					format!("Failed to create socket directory: {}", parent.display())
				})?;
			}
		}
		let listener = UnixListener::bind(socket_path)
			.with_context(|| format!("Failed to bind daemon socket: {}", socket_path.display()))?;
		info!(
			target = "sk.daemon",
			socket = %socket_path.display(),
			"daemon listening"
		);

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		Ok(Self {
			state: Arc::new(Mutex::new(CoordinatorState {
				registry: SessionRegistry::new(),
				remote,
				panel_attached: false,
			})),
			shutdown_tx,
			shutdown_rx,
			listener,
		})
	}

	#[cfg(windows)]
	pub async fn start(remote: RemoteClient) -> Result<Self> {
		let addr = format!("127.0.0.1:{}", DAEMON_TCP_PORT);
		let listener = TcpListener::bind(&addr)
			.await
			.with_context(|| format!("Failed to bind daemon TCP socket: {addr}"))?;
		info!(target = "sk.daemon", addr, "daemon listening");

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		Ok(Self {
			state: Arc::new(Mutex::new(CoordinatorState {
				registry: SessionRegistry::new(),
				remote,
				panel_attached: false,
			})),
			shutdown_tx,
			shutdown_rx,
			listener,
		})
	}

	pub async fn run(self) -> Result<()> {
		self.run_with_ready(None).await
	}

	pub async fn run_with_ready(mut self, ready: Option<oneshot::Sender<()>>) -> Result<()> {
		if let Some(ready) = ready {
			let _ = ready.send(());
		}

		#[cfg(unix)]
		{
			run_unix(
				self.listener,
				self.state,
				self.shutdown_tx,
				&mut self.shutdown_rx,
			)
			.await
		}

		#[cfg(windows)]
		{
			run_tcp(
				self.listener,
				self.state,
				self.shutdown_tx,
				&mut self.shutdown_rx,
			)
			.await
		}
	}
}

#[cfg(unix)]
async fn run_unix(
	listener: UnixListener,
	state: Arc<Mutex<CoordinatorState>>,
	shutdown_tx: watch::Sender<bool>,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<()> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm =
		signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
	let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

	loop {
		tokio::select! {
			_ = shutdown_rx.changed() => {
				if *shutdown_rx.borrow() {
					info!(target = "sk.daemon", "shutdown requested via message");
					break;
				}
			}
			_ = sigterm.recv() => {
				info!(target = "sk.daemon", "received SIGTERM, shutting down");
				sweep(&state).await;
				break;
			}
			_ = sigint.recv() => {
				info!(target = "sk.daemon", "received SIGINT, shutting down");
				sweep(&state).await;
				break;
			}
			accept = listener.accept() => {
				let (stream, _) = accept.context("Daemon accept failed")?;
				let state = Arc::clone(&state);
				let shutdown_tx = shutdown_tx.clone();
				tokio::spawn(async move {
					if let Err(err) = handle_client(stream, state, shutdown_tx).await {
						warn!(target = "sk.daemon", error = %err, "daemon connection error");
					}
				});
			}
		}
	}

	Ok(())
}

#[cfg(windows)]
async fn run_tcp(
	listener: TcpListener,
	state: Arc<Mutex<CoordinatorState>>,
	shutdown_tx: watch::Sender<bool>,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<()> {
	loop {
		tokio::select! {
			_ = shutdown_rx.changed() => {
				if *shutdown_rx.borrow() {
					info!(target = "sk.daemon", "shutdown requested via message");
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => {
				info!(target = "sk.daemon", "received Ctrl+C, shutting down");
				sweep(&state).await;
				break;
			}
			accept = listener.accept() => {
				let (stream, _) = accept.context("Daemon accept failed")?;
				let state = Arc::clone(&state);
				let shutdown_tx = shutdown_tx.clone();
				tokio::spawn(async move {
					if let Err(err) = handle_client(stream, state, shutdown_tx).await {
						warn!(target = "sk.daemon", error = %err, "daemon connection error");
					}
				});
			}
		}
	}

	Ok(())
}

async fn handle_client<S>(
	stream: S,
	state: Arc<Mutex<CoordinatorState>>,
	shutdown_tx: watch::Sender<bool>,
) -> Result<()>
where
	S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
	let mut attached = false;
	let result = serve_connection(stream, &state, &shutdown_tx, &mut attached).await;

	// A dropped panel connection triggers the sweep whether the panel closed
	// cleanly or crashed mid-request; the attach slot is only freed once the
	// sweep has been processed.
	if attached {
		info!(target = "sk.daemon", "panel disconnected, sweeping sessions");
		sweep(&state).await;
		state.lock().await.panel_attached = false;
	}

	result
}

async fn serve_connection<S>(
	stream: S,
	state: &Arc<Mutex<CoordinatorState>>,
	shutdown_tx: &watch::Sender<bool>,
	attached: &mut bool,
) -> Result<()>
where
	S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
	let (read_half, mut write_half) = tokio::io::split(stream);
	let mut reader = BufReader::new(read_half);
	let mut line = String::new();

	loop {
		line.clear();
		let bytes = reader
			.read_line(&mut line)
			.await
			.context("Failed reading daemon request")?;
		if bytes == 0 {
			break;
		}

		let request = match serde_json::from_str::<DaemonRequest>(line.trim_end()) {
			Ok(req) => req,
			Err(err) => {
				let response = DaemonResponse::Error {
					code: "invalid_request".to_string(),
					message: err.to_string(),
				};
				write_response(&mut write_half, &response).await?;
				continue;
			}
		};

		let response = handle_request(state, shutdown_tx.clone(), request, attached).await;
		write_response(&mut write_half, &response).await?;
	}

	Ok(())
}

async fn write_response<W>(writer: &mut W, response: &DaemonResponse) -> Result<()>
where
	W: tokio::io::AsyncWrite + Unpin,
{
	let payload = serde_json::to_string(response).context("Failed to serialize response")?;
	writer
		.write_all(format!("{}\n", payload).as_bytes())
		.await
		.context("Failed writing daemon response")?;
	writer
		.flush()
		.await
		.context("Failed flushing daemon response")?;
	Ok(())
}

async fn handle_request(
	state: &Arc<Mutex<CoordinatorState>>,
	shutdown_tx: watch::Sender<bool>,
	request: DaemonRequest,
	attached: &mut bool,
) -> DaemonResponse {
	match request {
		DaemonRequest::Ping => DaemonResponse::Pong,
		DaemonRequest::Attach => {
			if *attached {
				// Re-attach on the same connection is harmless.
				return DaemonResponse::Ok;
			}
			let mut daemon = state.lock().await;
			if daemon.panel_attached {
				DaemonResponse::Error {
					code: "panel_attached".to_string(),
					message: "another panel is already attached".to_string(),
				}
			} else {
				daemon.panel_attached = true;
				*attached = true;
				info!(target = "sk.daemon", "panel attached");
				DaemonResponse::Ok
			}
		}
		DaemonRequest::RegisterSession { session_id } => {
			let mut daemon = state.lock().await;
			if daemon.registry.register(&session_id) {
				debug!(target = "sk.daemon", session = %session_id, "session registered");
			}
			DaemonResponse::Ok
		}
		DaemonRequest::ClearSession { session_id } => {
			// Acknowledges acceptance, not release outcome: by the time the
			// release fails the panel is usually already gone, so the result
			// is only observable in the daemon log.
			clear_session(state, &session_id).await;
			DaemonResponse::Ok
		}
		DaemonRequest::ListSessions => {
			let daemon = state.lock().await;
			DaemonResponse::Sessions {
				list: daemon.registry.snapshot(),
			}
		}
		DaemonRequest::Shutdown => {
			sweep(state).await;
			let _ = shutdown_tx.send(true);
			DaemonResponse::Ok
		}
	}
}

/// Releases `session_id` remotely and drops it from the registry on success.
/// A failed release keeps the entry so a later sweep or explicit clear can
/// try again. Empty ids are a benign no-op.
async fn clear_session(state: &Arc<Mutex<CoordinatorState>>, session_id: &str) {
	if session_id.is_empty() {
		return;
	}

	let remote = state.lock().await.remote.clone();
	match remote.release(session_id).await {
		Ok(()) => {
			state.lock().await.registry.remove(session_id);
			info!(target = "sk.daemon", session = %session_id, "session released");
		}
		Err(err) => {
			warn!(
				target = "sk.daemon",
				session = %session_id,
				error = %err,
				"session release failed, keeping entry"
			);
		}
	}
}

/// Releases every tracked session and empties the registry.
///
/// Release calls run concurrently and independently; one failure never
/// blocks the others. The registry ends up empty regardless of outcomes;
/// failures are logged and the entries dropped.
async fn sweep(state: &Arc<Mutex<CoordinatorState>>) {
	let (sessions, remote) = {
		let mut daemon = state.lock().await;
		(daemon.registry.drain(), daemon.remote.clone())
	};

	if sessions.is_empty() {
		return;
	}

	info!(target = "sk.daemon", count = sessions.len(), "sweeping sessions");

	let releases = sessions.into_iter().map(|session_id| {
		let remote = remote.clone();
		async move {
			match remote.release(&session_id).await {
				Ok(()) => {
					info!(target = "sk.daemon", session = %session_id, "session released");
				}
				Err(err) => {
					warn!(
						target = "sk.daemon",
						session = %session_id,
						error = %err,
						"session release failed, dropping entry"
					);
				}
			}
		}
	});

	join_all(releases).await;
}
