//! Records and their named, timestamped attributes.

pub mod attributes;
pub mod named_value;
pub mod record;

pub use attributes::Attributes;
pub use named_value::{parse_timestamp, NamedValue};
pub use record::{Asset, Position, Record, TrackedAsset};
