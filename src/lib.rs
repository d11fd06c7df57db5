//! # statusboard
//!
//! A hierarchical state-aggregation engine.
//!
//! Records (typed assets made of named, timestamped values) are grouped
//! into segments. Each segment pairs every record with a view element that
//! summarises it; elements report summary changes to their segment, which
//! tags them with a stable slot index. The board routes records to the
//! first segment that accepts them and rate-limits the resulting change
//! stream into one de-duplicated notification per window, carrying a
//! checksum of every segment it touched.
//!
//! Layers, bottom-up:
//!
//! - [`values`]: [`NamedValue`], [`Attributes`] and the [`Record`] trait.
//! - [`elements`]: [`ViewElement`], pluggable [`ElementBehavior`]s and the
//!   [`ElementFactory`].
//! - [`groups`]: [`Group`] segments, geo-fenced segments and checksums.
//! - [`board`]: the [`Board`] aggregator, coalescing, the ticker and
//!   configuration.
//! - [`events`]: the per-entity [`EventBus`] and every event payload.

pub mod board;
pub mod elements;
pub mod error;
pub mod events;
pub mod groups;
pub mod utilities;
pub mod values;

pub use board::{spawn_ticker, Board, BoardConfig};
pub use elements::{Acceptance, ElementBehavior, ElementFactory, StatusView, ViewElement};
pub use error::{BoardError, ErrorKind, Result};
pub use events::{BoardChanged, EventBus};
pub use groups::{Boundary, ContainsFn, Group};
pub use values::{Asset, Attributes, NamedValue, Position, Record, TrackedAsset};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
