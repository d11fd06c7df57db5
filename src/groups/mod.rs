//! Segments: positionally stable groups of elements and the records they own.

pub mod checksum;
pub mod geo_group;
pub mod group;

pub use checksum::checksum;
pub use geo_group::{Boundary, ContainsFn, GeoFence};
pub use group::{AcceptAll, Admission, AdmissionPolicy, Group};
