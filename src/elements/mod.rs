//! View elements, their behaviours and the factory that manufactures them.

pub mod acceptance;
pub mod behavior;
pub mod factory;
pub mod render;
pub mod status;
pub mod view_element;

pub use acceptance::Acceptance;
pub use behavior::{default_summary, BasicView, ElementBehavior, ElementContext};
pub use factory::{ElementConstructor, ElementFactory, DEFAULT_VIEW_TYPE, STATUS_VIEW_TYPE};
pub use render::RenderFormat;
pub use status::{Condition, StatusThresholds, StatusView};
pub use view_element::ViewElement;
