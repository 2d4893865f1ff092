//! Stratum priority registry.
//!
//! Every stratum id belongs to one of four [`Band`]s. Priorities inside a band
//! are handed out in registration order so later registrations stack above
//! earlier ones without ever crossing into the next band.
//!
//! # Built-in strata (bottom to top)
//!
//! 1. `defaults` (default band)
//! 2. `underride`, `definition`, `override` (definition band)
//! 3. `user` (user band)
//!
//! The pseudo-ids [`TOP`] and [`BOTTOM`] always sort above and below every
//! registered id. They are used by combined views.

use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;

use crate::error::DeveloperError;


/// Well-known stratum ids.
pub mod common {
	pub const DEFAULTS: &str = "defaults";
	pub const UNDERRIDE: &str = "underride";
	pub const DEFINITION: &str = "definition";
	pub const OVERRIDE: &str = "override";
	pub const USER: &str = "user";
}

/// Pseudo-id that sorts above every registered stratum.
pub const TOP: &str = "top";
/// Pseudo-id that sorts below every registered stratum.
pub const BOTTOM: &str = "bottom";

const BAND_WIDTH: i32 = 1000;
const BAND_STEP: i32 = 10;

/// Priority band of a stratum id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
	/// Lowest: compiled-in defaults.
	Default,
	/// Server or remote-derived metadata.
	Load,
	/// Authored catalog JSON.
	Definition,
	/// Highest: interactive edits.
	User,
}

impl Band {
	const ALL: [Band; 4] = [Band::Default, Band::Load, Band::Definition, Band::User];

	fn index(self) -> usize {
		self as usize
	}

	fn base(self) -> i32 {
		self.index() as i32 * BAND_WIDTH
	}
}

#[derive(Debug, Clone, Default)]
struct OrderSnapshot {
	priorities: HashMap<Box<str>, i32>,
	bands: HashMap<Box<str>, Band>,
	next: [i32; 4],
}

impl OrderSnapshot {
	fn builtin() -> Self {
		let mut snap = Self {
			next: Band::ALL.map(Band::base),
			..Self::default()
		};
		snap.insert(common::DEFAULTS, Band::Default);
		snap.insert(common::UNDERRIDE, Band::Definition);
		snap.insert(common::DEFINITION, Band::Definition);
		snap.insert(common::OVERRIDE, Band::Definition);
		snap.insert(common::USER, Band::User);
		snap
	}

	/// Returns false if the id was already registered.
	fn insert(&mut self, id: &str, band: Band) -> bool {
		if self.priorities.contains_key(id) {
			return false;
		}
		let slot = &mut self.next[band.index()];
		self.priorities.insert(Box::from(id), *slot);
		self.bands.insert(Box::from(id), band);
		*slot += BAND_STEP;
		true
	}
}

/// Process-wide table of stratum priorities.
///
/// Reads are lock-free against an immutable snapshot; registration swaps in a
/// new snapshot.
pub struct StratumOrder {
	snap: ArcSwap<OrderSnapshot>,
}

static GLOBAL: LazyLock<StratumOrder> = LazyLock::new(StratumOrder::new);

impl Default for StratumOrder {
	fn default() -> Self {
		Self::new()
	}
}

impl StratumOrder {
	/// Creates a registry holding only the built-in strata.
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(OrderSnapshot::builtin()),
		}
	}

	/// The shared registry used by every model.
	pub fn global() -> &'static StratumOrder {
		&GLOBAL
	}

	/// Registers `id` in `band`, returning `false` if it was already registered.
	///
	/// An id keeps the band and priority of its first registration.
	pub fn register(&self, id: &str, band: Band) -> bool {
		loop {
			let cur = self.snap.load_full();
			if let Some(existing) = cur.bands.get(id) {
				if *existing != band {
					tracing::warn!(
						domain = "strata",
						id,
						registered = ?existing,
						requested = ?band,
						"stratum already registered in another band; keeping original",
					);
				}
				return false;
			}
			let mut next = (*cur).clone();
			next.insert(id, band);
			let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
			if Arc::ptr_eq(&prev, &cur) {
				tracing::debug!(domain = "strata", id, band = ?band, "registered stratum");
				return true;
			}
		}
	}

	pub fn register_default(&self, id: &str) -> bool {
		self.register(id, Band::Default)
	}

	pub fn register_load(&self, id: &str) -> bool {
		self.register(id, Band::Load)
	}

	pub fn register_definition(&self, id: &str) -> bool {
		self.register(id, Band::Definition)
	}

	pub fn register_user(&self, id: &str) -> bool {
		self.register(id, Band::User)
	}

	/// Returns true if `id` can be used as a stratum id.
	pub fn is_registered(&self, id: &str) -> bool {
		id == TOP || id == BOTTOM || self.snap.load().priorities.contains_key(id)
	}

	/// Checks that `id` is usable, for write paths.
	pub fn ensure_registered(&self, id: &str) -> Result<(), DeveloperError> {
		if self.is_registered(id) {
			Ok(())
		} else {
			Err(DeveloperError::UnregisteredStratum(id.to_string()))
		}
	}

	/// Returns the numeric priority of a registered id.
	pub fn priority(&self, id: &str) -> Result<i32, DeveloperError> {
		self.snap
			.load()
			.priorities
			.get(id)
			.copied()
			.ok_or_else(|| DeveloperError::UnregisteredStratum(id.to_string()))
	}

	/// Returns the band of a registered id.
	pub fn band(&self, id: &str) -> Option<Band> {
		self.snap.load().bands.get(id).copied()
	}

	/// Drops every registration except the built-in strata.
	pub fn reset(&self) {
		self.snap.store(Arc::new(OrderSnapshot::builtin()));
	}

	/// Compares two ids, higher priority first.
	pub fn compare(&self, a: &str, b: &str) -> Result<Ordering, DeveloperError> {
		let snap = self.snap.load();
		compare_in(&snap, a, b)
	}

	/// Sorts strata from highest to lowest priority.
	///
	/// # Errors
	///
	/// Fails if any id is not registered.
	pub fn try_sort_top_to_bottom<T, K: AsRef<str>>(&self, items: impl IntoIterator<Item = (K, T)>) -> Result<Vec<(K, T)>, DeveloperError> {
		let snap = self.snap.load();
		let mut items: Vec<(K, T)> = items.into_iter().collect();
		for (id, _) in &items {
			let id = id.as_ref();
			if id != TOP && id != BOTTOM && !snap.priorities.contains_key(id) {
				return Err(DeveloperError::UnregisteredStratum(id.to_string()));
			}
		}
		items.sort_by(|(a, _), (b, _)| compare_in(&snap, a.as_ref(), b.as_ref()).unwrap_or(Ordering::Equal));
		Ok(items)
	}

	/// Sorts strata from highest to lowest priority.
	///
	/// # Panics
	///
	/// Panics if any id is not registered. Writes through models reject
	/// unregistered ids up front, so this only fires if the registry was
	/// [`reset`](Self::reset) while models still held such strata.
	pub fn sort_top_to_bottom<T, K: AsRef<str>>(&self, items: impl IntoIterator<Item = (K, T)>) -> Vec<(K, T)> {
		match self.try_sort_top_to_bottom(items) {
			Ok(sorted) => sorted,
			Err(error) => panic!("{error}"),
		}
	}

	/// Sorts strata from lowest to highest priority. Exactly the reverse of
	/// [`sort_top_to_bottom`](Self::sort_top_to_bottom).
	///
	/// # Panics
	///
	/// Panics if any id is not registered.
	pub fn sort_bottom_to_top<T, K: AsRef<str>>(&self, items: impl IntoIterator<Item = (K, T)>) -> Vec<(K, T)> {
		let mut sorted = self.sort_top_to_bottom(items);
		sorted.reverse();
		sorted
	}
}

/// Total order, higher priority first. Equal priorities only occur for
/// identical ids.
fn compare_in(snap: &OrderSnapshot, a: &str, b: &str) -> Result<Ordering, DeveloperError> {
	if a == b {
		return Ok(Ordering::Equal);
	}
	if a == TOP || b == BOTTOM {
		return Ok(Ordering::Less);
	}
	if b == TOP || a == BOTTOM {
		return Ok(Ordering::Greater);
	}
	let pa = snap
		.priorities
		.get(a)
		.ok_or_else(|| DeveloperError::UnregisteredStratum(a.to_string()))?;
	let pb = snap
		.priorities
		.get(b)
		.ok_or_else(|| DeveloperError::UnregisteredStratum(b.to_string()))?;
	Ok(pb.cmp(pa))
}
