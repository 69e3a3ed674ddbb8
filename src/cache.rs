use std::{sync::Arc, time::Duration};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mockable::Clock;

use crate::pagination::PageRequest;

/// How long a rendered global feed page is served before it is recomputed.
pub const GLOBAL_FEED_TTL: Duration = Duration::from_secs(20);

/// Live entries kept by a [`MemoryPageCache`] unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// The cache key of a global feed page. Only the page parameter varies it.
pub fn global_feed_key(request: &PageRequest) -> String {
	format!("feed:global:page={}", request.cache_key())
}

/// A store of rendered pages with a per-entry lifetime.
///
/// Entries are returned verbatim until they expire or the cache is flushed,
/// writes to the underlying data do not invalidate them.
#[axum::async_trait]
pub trait PageCache: Send + Sync {
	async fn get(&self, key: &str) -> Option<Bytes>;

	async fn set(&self, key: &str, value: Bytes, ttl: Duration);

	/// Drops every entry, regardless of its remaining lifetime.
	async fn flush(&self);
}

struct Entry {
	value: Bytes,
	/// `None` when the lifetime does not fit in a timestamp.
	expires_at: Option<DateTime<Utc>>,
}

impl Entry {
	fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}
}

/// An in-process [`PageCache`].
pub struct MemoryPageCache {
	entries: DashMap<String, Entry>,
	clock: Arc<dyn Clock + Send + Sync>,
	max_entries: usize,
}

impl Default for MemoryPageCache {
	fn default() -> Self {
		Self::with_clock(Arc::new(mockable::DefaultClock))
	}
}

impl MemoryPageCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
		Self {
			entries: DashMap::new(),
			clock,
			max_entries: DEFAULT_MAX_ENTRIES,
		}
	}

	#[must_use]
	pub fn max_entries(mut self, max_entries: usize) -> Self {
		self.max_entries = max_entries.max(1);
		self
	}

	/// Makes room for one more entry under `key`.
	///
	/// Expired entries go first, then the ones closest to expiry.
	fn evict(&self, key: &str, now: DateTime<Utc>) {
		self.entries.retain(|_, entry| !entry.is_expired(now));

		while self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
			let oldest = self
				.entries
				.iter()
				.min_by_key(|entry| entry.value().expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC))
				.map(|entry| entry.key().clone());

			let Some(oldest) = oldest else {
				break;
			};

			tracing::debug!(
				monotonic_counter.page_cache_evictions = 1_u64,
				key = %oldest,
				"evicting page"
			);
			self.entries.remove(&oldest);
		}
	}
}

#[axum::async_trait]
impl PageCache for MemoryPageCache {
	async fn get(&self, key: &str) -> Option<Bytes> {
		let now = self.clock.utc();

		if let Some(entry) = self.entries.get(key) {
			if !entry.is_expired(now) {
				tracing::debug!(monotonic_counter.page_cache_hits = 1_u64, key, "page cache hit");

				return Some(entry.value.clone());
			}
		}

		self.entries.remove_if(key, |_, entry| entry.is_expired(now));
		tracing::debug!(monotonic_counter.page_cache_misses = 1_u64, key, "page cache miss");

		None
	}

	async fn set(&self, key: &str, value: Bytes, ttl: Duration) {
		let now = self.clock.utc();
		let expires_at = chrono::Duration::from_std(ttl)
			.ok()
			.and_then(|ttl| now.checked_add_signed(ttl));

		self.evict(key, now);
		self.entries
			.insert(key.to_owned(), Entry { value, expires_at });
	}

	async fn flush(&self) {
		tracing::info!(entries = self.entries.len(), "flushing page cache");

		self.entries.clear();
	}
}
