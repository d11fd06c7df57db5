//! Registry of element constructors keyed by view type tag.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::elements::acceptance::Acceptance;
use crate::elements::behavior::{BasicView, ElementBehavior};
use crate::elements::status::StatusView;
use crate::elements::view_element::ViewElement;
use crate::error::{BoardError, Result};
use crate::values::Record;

/// View type used when neither the record nor a kind binding names one.
pub const DEFAULT_VIEW_TYPE: &str = "element";

/// View type of the built-in [`StatusView`].
pub const STATUS_VIEW_TYPE: &str = "status";

/// Builds a behaviour from constructor parameters.
pub type ElementConstructor =
    Arc<dyn Fn(&Value) -> Result<Box<dyn ElementBehavior>> + Send + Sync>;

fn basic_view(_params: &Value) -> Result<Box<dyn ElementBehavior>> {
    Ok(Box::new(BasicView))
}

fn status_view(params: &Value) -> Result<Box<dyn ElementBehavior>> {
    Ok(Box::new(StatusView::from_params(params)?))
}

#[derive(Clone)]
struct Registration {
    acceptance: Acceptance,
    constructor: ElementConstructor,
}

/// Optional string parameter; present but not a string is an error.
fn string_param<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(BoardError::InvalidInput(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

#[derive(Debug, Clone)]
struct KindBinding {
    view_type: String,
    params: Value,
}

/// Maps view type tags to constructors, validated when registered.
///
/// Segments call [`create_for`](Self::create_for) when no static element
/// takes a record; the element it returns is guaranteed to accept that
/// record.
#[derive(Clone)]
pub struct ElementFactory {
    registry: HashMap<String, Registration>,
    kind_bindings: HashMap<String, KindBinding>,
}

impl fmt::Debug for ElementFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut view_types: Vec<&String> = self.registry.keys().collect();
        view_types.sort();
        f.debug_struct("ElementFactory")
            .field("view_types", &view_types)
            .field("kind_bindings", &self.kind_bindings)
            .finish()
    }
}

impl Default for ElementFactory {
    /// A factory with the built-in `"element"` and `"status"` view types.
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.registry.insert(
            DEFAULT_VIEW_TYPE.to_string(),
            Registration {
                acceptance: Acceptance::Any,
                constructor: Arc::new(basic_view),
            },
        );
        factory.registry.insert(
            STATUS_VIEW_TYPE.to_string(),
            Registration {
                acceptance: Acceptance::Any,
                constructor: Arc::new(status_view),
            },
        );
        factory
    }
}

impl ElementFactory {
    /// A factory with nothing registered.
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
            kind_bindings: HashMap::new(),
        }
    }

    /// Register a constructor under `view_type`.
    ///
    /// `acceptance` is the predicate manufactured elements get unless
    /// constructor parameters override it.
    pub fn register<F>(
        &mut self,
        view_type: impl Into<String>,
        acceptance: Acceptance,
        constructor: F,
    ) -> Result<()>
    where
        F: Fn(&Value) -> Result<Box<dyn ElementBehavior>> + Send + Sync + 'static,
    {
        let view_type = view_type.into();
        if view_type.is_empty() {
            return Err(BoardError::InvalidInput(
                "view type tags must be non-empty".to_string(),
            ));
        }
        if self.registry.contains_key(&view_type) {
            return Err(BoardError::DuplicateViewType { view_type });
        }
        log::debug!("registering view type '{}' ({:?})", view_type, acceptance);
        self.registry.insert(
            view_type,
            Registration {
                acceptance,
                constructor: Arc::new(constructor),
            },
        );
        Ok(())
    }

    /// Manufacture `view_type` elements, built with `params`, for records of
    /// `kind` that do not name a view type themselves.
    ///
    /// The parameters are checked by building one element up front.
    pub fn bind_kind(
        &mut self,
        kind: impl Into<String>,
        view_type: impl Into<String>,
        params: Value,
    ) -> Result<()> {
        let view_type = view_type.into();
        self.create(&view_type, &params, false)?;
        self.kind_bindings
            .insert(kind.into(), KindBinding { view_type, params });
        Ok(())
    }

    pub fn contains(&self, view_type: &str) -> bool {
        self.registry.contains_key(view_type)
    }

    /// View type that [`create_for`](Self::create_for) would build for
    /// `record`.
    pub fn resolve_view_type<'a>(&'a self, record: &'a dyn Record) -> &'a str {
        self.resolve(record).0
    }

    /// The record's own view type (built without parameters), else its kind
    /// binding, else the default.
    fn resolve<'a>(&'a self, record: &'a dyn Record) -> (&'a str, &'a Value) {
        if let Some(view_type) = record.view_type() {
            return (view_type, &Value::Null);
        }
        match self.kind_bindings.get(record.kind()) {
            Some(binding) => (binding.view_type.as_str(), &binding.params),
            None => (DEFAULT_VIEW_TYPE, &Value::Null),
        }
    }

    /// Build an element of `view_type`.
    ///
    /// `params.accepts` (exact kind) or `params.accepts_pattern` (regex)
    /// override the registered acceptance; the remaining parameters go to
    /// the constructor.
    pub fn create(&self, view_type: &str, params: &Value, is_static: bool) -> Result<ViewElement> {
        let registration =
            self.registry
                .get(view_type)
                .ok_or_else(|| BoardError::NoSuchViewType {
                    view_type: view_type.to_string(),
                })?;

        let acceptance = if let Some(kind) = string_param(params, "accepts")? {
            Acceptance::kind(kind)
        } else if let Some(pattern) = string_param(params, "accepts_pattern")? {
            Acceptance::pattern(pattern)?
        } else {
            registration.acceptance.clone()
        };

        let behavior = (registration.constructor)(params)?;
        Ok(ViewElement::new(view_type, acceptance, behavior, is_static))
    }

    /// Build a non-static element for `record`, verified with a dry-run
    /// pairing.
    pub fn create_for(&self, record: &dyn Record) -> Result<ViewElement> {
        let (view_type, params) = self.resolve(record);
        let mut element = self.create(view_type, params, false)?;
        if !element.pair(record, true) {
            return Err(BoardError::TypeNotAccepted {
                view_type: view_type.to_string(),
                kind: record.kind().to_string(),
            });
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Asset;
    use serde_json::json;

    #[test]
    fn test_default_factory_builds_basic_elements() {
        let factory = ElementFactory::default();
        let record = Asset::new("a-1", "pump", [("load", json!(0))]).unwrap();
        let element = factory.create_for(&record).unwrap();
        assert_eq!(element.view_type(), DEFAULT_VIEW_TYPE);
        assert!(!element.is_static());
        assert!(!element.is_paired());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut factory = ElementFactory::default();
        let err = factory
            .register(DEFAULT_VIEW_TYPE, Acceptance::Any, |_| Ok(Box::new(BasicView)))
            .unwrap_err();
        assert!(matches!(err, BoardError::DuplicateViewType { .. }));
    }

    #[test]
    fn test_unknown_view_type() {
        let factory = ElementFactory::default();
        let record = Asset::new("a-1", "pump", [("load", json!(0))])
            .unwrap()
            .with_view_type("gauge");
        assert!(matches!(
            factory.create_for(&record),
            Err(BoardError::NoSuchViewType { .. })
        ));
    }

    #[test]
    fn test_type_not_accepted() {
        let mut factory = ElementFactory::default();
        factory
            .register("valve-view", Acceptance::kind("valve"), |_| Ok(Box::new(BasicView)))
            .unwrap();
        let record = Asset::new("a-1", "pump", [("load", json!(0))])
            .unwrap()
            .with_view_type("valve-view");
        assert!(matches!(
            factory.create_for(&record),
            Err(BoardError::TypeNotAccepted { .. })
        ));
    }

    #[test]
    fn test_kind_binding() {
        let mut factory = ElementFactory::default();
        factory
            .register("pump-view", Acceptance::kind("pump"), |_| Ok(Box::new(BasicView)))
            .unwrap();
        factory
            .bind_kind(
                "pump",
                STATUS_VIEW_TYPE,
                json!({"attribute": "load", "warning": 70, "critical": 90}),
            )
            .unwrap();
        assert!(matches!(
            factory.bind_kind("valve", "missing", Value::Null),
            Err(BoardError::NoSuchViewType { .. })
        ));
        assert!(factory
            .bind_kind("meter", STATUS_VIEW_TYPE, json!({"warning": 1}))
            .is_err());

        let record = Asset::new("a-1", "pump", [("load", json!(0))]).unwrap();
        assert_eq!(factory.resolve_view_type(&record), STATUS_VIEW_TYPE);
        let element = factory.create_for(&record).unwrap();
        assert_eq!(element.view_type(), STATUS_VIEW_TYPE);

        let named = Asset::new("a-2", "pump", [("load", json!(0))])
            .unwrap()
            .with_view_type("pump-view");
        assert_eq!(factory.create_for(&named).unwrap().view_type(), "pump-view");
    }

    #[test]
    fn test_non_string_acceptance_params_rejected() {
        let factory = ElementFactory::default();
        for params in [json!({"accepts": 5}), json!({"accepts_pattern": ["pump"]})] {
            let err = factory.create(DEFAULT_VIEW_TYPE, &params, true).unwrap_err();
            assert!(matches!(err, BoardError::InvalidInput(_)));
        }
        let element = factory
            .create(DEFAULT_VIEW_TYPE, &json!({"accepts": null}), true)
            .unwrap();
        assert!(matches!(element.acceptance(), Acceptance::Any));
    }

    #[test]
    fn test_create_with_acceptance_override() {
        let factory = ElementFactory::default();
        let element = factory
            .create(DEFAULT_VIEW_TYPE, &json!({"accepts_pattern": "pump|valve"}), true)
            .unwrap();
        assert!(element.is_static());
        let valve = Asset::new("v-1", "valve", [("open", json!(false))]).unwrap();
        let meter = Asset::new("m-1", "meter", [("kwh", json!(0))]).unwrap();
        assert!(element.accepts(&valve));
        assert!(!element.accepts(&meter));
    }
}
