//! The trait every event payload implements.

/// Trait implemented by every payload dispatched through an
/// [`EventBus`](crate::events::EventBus).
pub trait BaseEvent: Clone + Send + std::fmt::Debug {
    /// Event kind discriminator (e.g. `"changed"`, `"paired"`).
    ///
    /// Subscriptions registered with [`EventBus::on`](crate::events::EventBus::on)
    /// are matched against this string.
    fn event_type(&self) -> &'static str;
}
