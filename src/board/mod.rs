//! The top-level aggregator and its coalesced notifications.
//!
//! - [`Board`]: routes records to segments, buffers their changes.
//! - [`Coalescer`]: per-window de-duplication of buffered changes.
//! - [`spawn_ticker`]: tokio timer that releases quiet buffers.
//! - [`BoardConfig`]: YAML/JSON topology loaded into a board.

pub mod aggregator;
pub mod coalescer;
pub mod config;
pub mod ticker;

pub use aggregator::{Board, DEFAULT_MIN_INTERVAL};
pub use coalescer::Coalescer;
pub use config::{BoardConfig, GroupConfig, KindBindingConfig, StaticElementConfig};
pub use ticker::{spawn_ticker, MIN_TICK_PERIOD};
