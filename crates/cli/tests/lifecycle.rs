//! End-to-end daemon lifecycle tests over a real socket.
//!
//! Each test runs a coordinator on its own temp socket against a stub
//! assist service, then drives it exactly the way a panel process would:
//! connect, attach, register sessions, and disconnect.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sidekick_cli::daemon::{Coordinator, DaemonRequest, DaemonResponse};
use sidekick_client::RemoteClient;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Stub assist service: records release paths, fails any request whose path
/// contains `fail_marker`.
async fn spawn_release_mock(fail_marker: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let recorder = Arc::clone(&seen);

	tokio::spawn(async move {
		loop {
			let Ok((mut stream, _)) = listener.accept().await else {
				break;
			};
			let recorder = Arc::clone(&recorder);
			tokio::spawn(async move {
				let mut buf = vec![0u8; 4096];
				let n = stream.read(&mut buf).await.unwrap_or(0);
				let head = String::from_utf8_lossy(&buf[..n]).to_string();
				let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
				recorder.lock().await.push(path.clone());

				let response = if path.contains(fail_marker) {
					"HTTP/1.1 500 INTERNAL SERVER ERROR\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
				} else {
					"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
				};
				let _ = stream.write_all(response.as_bytes()).await;
				let _ = stream.shutdown().await;
			});
		}
	});

	(format!("http://{addr}"), seen)
}

async fn start_daemon(base: &str) -> (TempDir, PathBuf) {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sk-daemon.sock");
	let coordinator = Coordinator::bind(&path, RemoteClient::new(base).unwrap())
		.await
		.unwrap();
	tokio::spawn(coordinator.run());
	(dir, path)
}

async fn connect(path: &std::path::Path) -> BufReader<UnixStream> {
	for _ in 0..50 {
		match UnixStream::connect(path).await {
			Ok(stream) => return BufReader::new(stream),
			Err(_) => sleep(Duration::from_millis(20)).await,
		}
	}
	panic!("daemon socket never came up at {}", path.display());
}

async fn send_raw(conn: &mut BufReader<UnixStream>, payload: &str) -> DaemonResponse {
	conn.get_mut()
		.write_all(format!("{payload}\n").as_bytes())
		.await
		.unwrap();
	let mut line = String::new();
	conn.read_line(&mut line).await.unwrap();
	serde_json::from_str(&line).unwrap()
}

async fn send(conn: &mut BufReader<UnixStream>, request: DaemonRequest) -> DaemonResponse {
	let payload = serde_json::to_string(&request).unwrap();
	send_raw(conn, &payload).await
}

async fn register(conn: &mut BufReader<UnixStream>, session_id: &str) {
	let response = send(
		conn,
		DaemonRequest::RegisterSession {
			session_id: session_id.to_string(),
		},
	)
	.await;
	assert!(matches!(response, DaemonResponse::Ok));
}

async fn tracked_sessions(conn: &mut BufReader<UnixStream>) -> Vec<String> {
	match send(conn, DaemonRequest::ListSessions).await {
		DaemonResponse::Sessions { list } => {
			list.into_iter().map(|info| info.session_id).collect()
		}
		other => panic!("unexpected response: {other:?}"),
	}
}

#[tokio::test]
async fn connection_close_sweeps_every_tracked_session() {
	let (base, seen) = spawn_release_mock("bad").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut panel = connect(&sock).await;
	assert!(matches!(
		send(&mut panel, DaemonRequest::Attach).await,
		DaemonResponse::Ok
	));
	register(&mut panel, "good_a").await;
	register(&mut panel, "bad_b").await;
	// Re-registering is idempotent; the sweep must still release good_a once.
	register(&mut panel, "good_a").await;

	drop(panel);

	for _ in 0..100 {
		if seen.lock().await.len() == 2 {
			break;
		}
		sleep(Duration::from_millis(20)).await;
	}
	let mut paths = seen.lock().await.clone();
	paths.sort();
	assert_eq!(paths, ["/clear/bad_b", "/clear/good_a"]);

	// Force-cleared even though bad_b's release failed.
	let mut control = connect(&sock).await;
	assert!(tracked_sessions(&mut control).await.is_empty());
}

#[tokio::test]
async fn attach_slot_frees_only_after_close_is_processed() {
	let (base, _seen) = spawn_release_mock("__none__").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut first = connect(&sock).await;
	assert!(matches!(
		send(&mut first, DaemonRequest::Attach).await,
		DaemonResponse::Ok
	));

	let mut second = connect(&sock).await;
	assert!(matches!(
		send(&mut second, DaemonRequest::Attach).await,
		DaemonResponse::Error { ref code, .. } if code == "panel_attached"
	));

	drop(first);

	let mut reattached = false;
	for _ in 0..100 {
		let mut retry = connect(&sock).await;
		if matches!(send(&mut retry, DaemonRequest::Attach).await, DaemonResponse::Ok) {
			reattached = true;
			break;
		}
		sleep(Duration::from_millis(20)).await;
	}
	assert!(reattached, "attach slot never freed after panel close");
}

#[tokio::test]
async fn clear_session_acknowledges_and_releases_remotely() {
	let (base, seen) = spawn_release_mock("__none__").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut panel = connect(&sock).await;
	assert!(matches!(
		send(&mut panel, DaemonRequest::Attach).await,
		DaemonResponse::Ok
	));
	register(&mut panel, "page_1").await;

	let response = send(
		&mut panel,
		DaemonRequest::ClearSession {
			session_id: "page_1".to_string(),
		},
	)
	.await;
	assert!(matches!(response, DaemonResponse::Ok));

	assert_eq!(seen.lock().await.as_slice(), ["/clear/page_1"]);
	assert!(tracked_sessions(&mut panel).await.is_empty());
}

#[tokio::test]
async fn failed_clear_keeps_session_until_the_sweep() {
	let (base, seen) = spawn_release_mock("page_1").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut panel = connect(&sock).await;
	assert!(matches!(
		send(&mut panel, DaemonRequest::Attach).await,
		DaemonResponse::Ok
	));
	register(&mut panel, "page_1").await;

	// The clear is acknowledged even though the release fails; the entry
	// stays tracked for a later retry.
	let response = send(
		&mut panel,
		DaemonRequest::ClearSession {
			session_id: "page_1".to_string(),
		},
	)
	.await;
	assert!(matches!(response, DaemonResponse::Ok));
	assert_eq!(tracked_sessions(&mut panel).await, ["page_1"]);

	// The sweep retries the release, then drops the entry regardless.
	drop(panel);
	for _ in 0..100 {
		if seen.lock().await.len() == 2 {
			break;
		}
		sleep(Duration::from_millis(20)).await;
	}
	assert_eq!(seen.lock().await.len(), 2);

	let mut control = connect(&sock).await;
	assert!(tracked_sessions(&mut control).await.is_empty());
}

#[tokio::test]
async fn empty_clear_session_is_a_tolerated_noop() {
	let (base, seen) = spawn_release_mock("__none__").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut panel = connect(&sock).await;
	let response = send(
		&mut panel,
		DaemonRequest::ClearSession {
			session_id: String::new(),
		},
	)
	.await;

	assert!(matches!(response, DaemonResponse::Ok));
	assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn control_connections_never_trigger_a_sweep() {
	let (base, seen) = spawn_release_mock("__none__").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut panel = connect(&sock).await;
	assert!(matches!(
		send(&mut panel, DaemonRequest::Attach).await,
		DaemonResponse::Ok
	));
	register(&mut panel, "page_1").await;

	// A status-style connection comes and goes without attaching.
	let mut control = connect(&sock).await;
	assert_eq!(tracked_sessions(&mut control).await, ["page_1"]);
	drop(control);

	sleep(Duration::from_millis(100)).await;
	assert!(seen.lock().await.is_empty());
	assert_eq!(tracked_sessions(&mut panel).await, ["page_1"]);
}

#[tokio::test]
async fn malformed_requests_do_not_kill_the_connection() {
	let (base, _seen) = spawn_release_mock("__none__").await;
	let (_dir, sock) = start_daemon(&base).await;

	let mut conn = connect(&sock).await;
	assert!(matches!(
		send(&mut conn, DaemonRequest::Ping).await,
		DaemonResponse::Pong
	));

	let response = send_raw(&mut conn, "{\"type\":\"nonsense\"}").await;
	assert!(matches!(
		response,
		DaemonResponse::Error { ref code, .. } if code == "invalid_request"
	));

	assert!(matches!(
		send(&mut conn, DaemonRequest::Ping).await,
		DaemonResponse::Pong
	));
}
