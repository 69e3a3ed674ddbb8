use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Number of items on every page of every feed.
pub const PAGE_SIZE: i64 = 10;

/// The raw `page` query parameter.
///
/// It is kept as a string so that malformed values fall back to a valid page
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, Validate, JsonSchema)]
pub struct PageRequest {
	/// The page number to return (1-indexed). Values that are not a number
	/// return the first page, values past the end return the last page.
	pub page: Option<String>,
}

impl PageRequest {
	pub fn number(page: i64) -> Self {
		Self {
			page: Some(page.to_string()),
		}
	}

	/// The requested page number, before clamping. Missing or non-numeric
	/// values are treated as the first page.
	fn requested(&self) -> i64 {
		self.page
			.as_deref()
			.and_then(|page| page.trim().parse().ok())
			.unwrap_or(1)
	}

	/// The part of the request that varies a cached page. Requests that
	/// resolve to the first page share a key.
	pub fn cache_key(&self) -> i64 {
		self.requested().max(1)
	}
}

/// A resolved slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub number: i64,
	pub num_pages: i64,
	pub total: i64,
	pub size: i64,
}

impl Window {
	pub fn offset(&self) -> i64 {
		(self.number - 1) * self.size
	}

	pub fn limit(&self) -> i64 {
		self.size
	}
}

/// Splits a result set of `total` items into pages of `size` items.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
	total: i64,
	size: i64,
}

impl Paginator {
	pub fn new(total: i64, size: i64) -> Self {
		Self {
			total: total.max(0),
			size: size.max(1),
		}
	}

	/// The number of pages, at least one even for an empty result set.
	pub fn num_pages(&self) -> i64 {
		((self.total + self.size - 1) / self.size).max(1)
	}

	/// Resolves a request to the nearest page that exists.
	pub fn window(&self, request: &PageRequest) -> Window {
		Window {
			number: request.requested().clamp(1, self.num_pages()),
			num_pages: self.num_pages(),
			total: self.total,
			size: self.size,
		}
	}
}

/// A single page of a feed.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Page<T> {
	/// The items on this page, in feed order.
	pub items: Vec<T>,
	/// The 1-indexed number of this page.
	pub number: i64,
	/// The total number of pages.
	pub num_pages: i64,
	/// The total number of items across all pages.
	pub total: i64,
	pub has_next: bool,
	pub has_previous: bool,
}

impl<T> Page<T> {
	pub fn new(items: Vec<T>, window: Window) -> Self {
		Self {
			items,
			number: window.number,
			num_pages: window.num_pages,
			total: window.total,
			has_next: window.number < window.num_pages,
			has_previous: window.number > 1,
		}
	}
}
