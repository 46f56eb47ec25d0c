use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use quantum_types::{Component, ComponentPayload, MicroFunctions, QuantumRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub mod assemble;
pub use assemble::assemble;

/// Cache negotiation rule for one component.
///
/// When `bypass_key` is present in the request's cache keys the client already
/// holds a current copy, so the component is left out of the response.
#[derive(Clone, Copy, Debug)]
pub struct ComponentRule {
    pub component: Component,
    pub bypass_key: Option<&'static str>,
}

pub const RULES: &[ComponentRule] = &[
    ComponentRule {
        component: Component::Profile,
        bypass_key: Some("userProfile_v2"),
    },
    ComponentRule {
        component: Component::Permissions,
        bypass_key: Some("userPermissions_v1"),
    },
    ComponentRule {
        component: Component::Notifications,
        bypass_key: None,
    },
    ComponentRule {
        component: Component::Settings,
        bypass_key: None,
    },
    ComponentRule {
        component: Component::Activity,
        bypass_key: None,
    },
];

pub fn rule_for(component: Component) -> Option<&'static ComponentRule> {
    RULES.iter().find(|r| r.component == component)
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Mock component data plus the micro-function table, fixed at startup.
#[derive(Clone, Debug)]
pub struct ComponentCatalog {
    data: BTreeMap<Component, Value>,
    micro_functions: MicroFunctions,
}

/// YAML overlay accepted by [`ComponentCatalog::from_path`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    components: BTreeMap<Component, Value>,
    #[serde(default)]
    micro_functions: MicroFunctions,
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self {
            data: default_component_data(),
            micro_functions: default_micro_functions(),
        }
    }
}

impl ComponentCatalog {
    pub fn new(data: BTreeMap<Component, Value>, micro_functions: MicroFunctions) -> Self {
        Self {
            data,
            micro_functions,
        }
    }

    /// Defaults overlaid with the entries of a YAML catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let mut catalog = Self::default();
        catalog.data.extend(file.components);
        catalog.micro_functions.extend(file.micro_functions);
        Ok(catalog)
    }

    pub fn micro_functions(&self) -> &MicroFunctions {
        &self.micro_functions
    }

    /// Resolve a single requested name. Unknown names and cache-bypassed
    /// components both yield `None`.
    pub fn resolve(&self, name: &str, cache_keys: &[String]) -> Option<Value> {
        let component: Component = name.parse().ok()?;
        self.resolve_component(component, cache_keys)
    }

    /// Resolve every requested component, in caller order.
    pub fn resolve_all(&self, req: &QuantumRequest) -> ComponentPayload {
        let mut payload = ComponentPayload::new();
        for name in &req.requested_components {
            let Ok(component) = name.parse::<Component>() else {
                continue;
            };
            if let Some(value) = self.resolve_component(component, &req.cache_keys) {
                payload.insert(component, value);
            }
        }
        payload
    }

    fn resolve_component(&self, component: Component, cache_keys: &[String]) -> Option<Value> {
        let rule = rule_for(component)?;
        if let Some(key) = rule.bypass_key {
            if cache_keys.iter().any(|k| k == key) {
                debug!(
                    component = %component,
                    cache_key = key,
                    "component served from client cache"
                );
                return None;
            }
        }
        self.data.get(&component).cloned()
    }
}

pub fn default_component_data() -> BTreeMap<Component, Value> {
    BTreeMap::from([
        (
            Component::Profile,
            json!({"name": "John Doe", "email": "john.doe@example.com"}),
        ),
        (
            Component::Permissions,
            json!({"roles": ["user"], "canEdit": true}),
        ),
        (
            Component::Notifications,
            json!({"messages": ["Welcome back!", "You have 3 new alerts."]}),
        ),
        (
            Component::Settings,
            json!({"theme": "dark", "language": "en"}),
        ),
        (
            Component::Activity,
            json!({"recentActions": ["login", "viewDashboard"]}),
        ),
    ])
}

pub fn default_micro_functions() -> MicroFunctions {
    BTreeMap::from([
        (
            "formatDate".to_string(),
            "(date) => new Date(date).toLocaleDateString()".to_string(),
        ),
        (
            "greetUser".to_string(),
            "(name) => `Hello, ${name}!`".to_string(),
        ),
        (
            "currency".to_string(),
            "(amount) => `$${Number(amount).toFixed(2)}`".to_string(),
        ),
    ])
}
