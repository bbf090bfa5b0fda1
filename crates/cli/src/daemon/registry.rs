//! In-memory registry of remote sessions owned by the open panel.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Instant;

use super::protocol::SessionInfo;

/// Tracks sessions presumed alive on the assist service and not yet released.
///
/// Purely in-memory; a daemon restart forgets everything. The registration
/// timestamp is monotonic and currently informational (reserved for
/// TTL-based sweeping).
#[derive(Debug, Default)]
pub struct SessionRegistry {
	sessions: HashMap<String, Instant>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self {
			sessions: HashMap::new(),
		}
	}

	/// Starts tracking `session_id` if not already tracked. Returns whether a
	/// new record was created; re-registering keeps the original timestamp.
	/// Empty ids are ignored.
	pub fn register(&mut self, session_id: &str) -> bool {
		if session_id.is_empty() {
			return false;
		}
		match self.sessions.entry(session_id.to_string()) {
			Entry::Occupied(_) => false,
			Entry::Vacant(slot) => {
				slot.insert(Instant::now());
				true
			}
		}
	}

	/// Stops tracking `session_id`. Returns whether a record existed.
	pub fn remove(&mut self, session_id: &str) -> bool {
		self.sessions.remove(session_id).is_some()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	/// Empties the registry, returning the ids that were tracked.
	pub fn drain(&mut self) -> Vec<String> {
		self.sessions.drain().map(|(id, _)| id).collect()
	}

	/// Snapshot of tracked sessions for listing, sorted by id.
	pub fn snapshot(&self) -> Vec<SessionInfo> {
		let mut list: Vec<SessionInfo> = self
			.sessions
			.iter()
			.map(|(id, registered_at)| SessionInfo {
				session_id: id.clone(),
				age_secs: registered_at.elapsed().as_secs(),
			})
			.collect();
		list.sort_by(|a, b| a.session_id.cmp(&b.session_id));
		list
	}
}
