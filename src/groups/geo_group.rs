//! Geo-fenced segments: admit only records positioned inside a boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::groups::group::{AdmissionPolicy, Group};
use crate::values::{Position, Record};

/// A polygon given by its vertices in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Boundary {
    pub vertices: Vec<Position>,
}

impl Boundary {
    pub fn new(vertices: Vec<Position>) -> Self {
        Self { vertices }
    }
}

/// Point-in-boundary test supplied by the caller.
pub type ContainsFn = Arc<dyn Fn(&Boundary, &Position) -> bool + Send + Sync>;

/// Admission policy that only lets in records whose position lies inside
/// `boundary`. Records without a position are rejected.
#[derive(Clone)]
pub struct GeoFence {
    boundary: Boundary,
    contains: ContainsFn,
}

impl GeoFence {
    pub fn new(boundary: Boundary, contains: ContainsFn) -> Self {
        Self { boundary, contains }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }
}

impl fmt::Debug for GeoFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoFence")
            .field("vertices", &self.boundary.vertices.len())
            .finish()
    }
}

impl AdmissionPolicy for GeoFence {
    fn admits(&self, record: &dyn Record) -> bool {
        record
            .position()
            .is_some_and(|position| (self.contains)(&self.boundary, &position))
    }
}

impl Group {
    /// A segment that admits records positioned inside `boundary`.
    pub fn geo(name: impl Into<String>, boundary: Boundary, contains: ContainsFn) -> Self {
        Group::new(name).with_admission(GeoFence::new(boundary, contains))
    }
}
