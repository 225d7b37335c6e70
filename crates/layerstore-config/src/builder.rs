//! Resolution of a configuration document into a store graph.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use layerstore_core::{DynAsyncStore, DynStore};
use serde_json::{Map, Value};
use tracing::debug;

use crate::built::BuiltStore;
use crate::document::StoreConfig;
use crate::env::{interpolate, Environment};
use crate::error::{ConfigError, ConfigResult};
use crate::registry::{BaseShape, BuildRequest, Children, StoreRegistry, StoreType};

/// Builds named definitions of a [`StoreConfig`] into stores.
///
/// Every [`build`](Self::build) call resolves the graph from scratch and
/// nothing is cached between calls. Within one call a definition may be
/// reached only once: a second reference, whether a true cycle or two
/// parents sharing a base, fails with [`ConfigError::Cycle`].
#[derive(Clone, Debug)]
pub struct StoreBuilder {
    config: StoreConfig,
    registry: StoreRegistry,
    env: Environment,
}

impl StoreBuilder {
    /// A builder over `config` with the built-in registry and the process
    /// environment.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            registry: StoreRegistry::with_builtins(),
            env: Environment::Process,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Ok(Self::new(StoreConfig::from_path(path)?))
    }

    pub fn with_registry(mut self, registry: StoreRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Register an additional type. See [`StoreRegistry::register`].
    pub fn register(&mut self, name: impl Into<String>, store_type: StoreType) -> Option<StoreType> {
        self.registry.register(name, store_type)
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn root_name<'a>(&'a self, name: Option<&'a str>) -> ConfigResult<&'a str> {
        name.or(self.config.main.as_deref())
            .ok_or(ConfigError::MissingMain)
    }

    /// Build `name`, or the document's `main` when `name` is `None`.
    pub fn build(&self, name: Option<&str>) -> ConfigResult<BuiltStore> {
        let name = self.root_name(name)?;
        let store = self.resolve(name, &mut Resolution::default())?;
        debug!(store = name, kind = store.kind(), "built store graph");
        Ok(store)
    }

    pub fn build_main(&self) -> ConfigResult<BuiltStore> {
        self.build(None)
    }

    /// Build a definition that must be a byte store.
    pub fn build_bytes(&self, name: Option<&str>) -> ConfigResult<DynStore> {
        let name = self.root_name(name)?;
        self.build(Some(name))?.into_bytes(name)
    }

    /// Build a definition that must be an async byte store.
    pub fn build_async(&self, name: Option<&str>) -> ConfigResult<DynAsyncStore> {
        let name = self.root_name(name)?;
        self.build(Some(name))?.into_async_bytes(name)
    }

    fn resolve(&self, name: &str, pass: &mut Resolution) -> ConfigResult<BuiltStore> {
        if !pass.visited.insert(name.to_string()) {
            let mut chain = pass.chain.clone();
            chain.push(name.to_string());
            return Err(ConfigError::Cycle {
                name: name.to_string(),
                chain,
            });
        }
        pass.chain.push(name.to_string());
        let result = self.construct(name, pass);
        pass.chain.pop();
        result
    }

    fn construct(&self, name: &str, pass: &mut Resolution) -> ConfigResult<BuiltStore> {
        let definition = self.config.definition(name)?;
        let type_name = definition.store_type.as_str();
        let store_type = self
            .registry
            .get(type_name)
            .ok_or_else(|| ConfigError::UnknownType {
                store: name.to_string(),
                type_name: type_name.to_string(),
            })?;
        debug!(store = name, store_type = type_name, "resolving store definition");

        let config = match interpolate(definition.config.clone(), &self.env)? {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let base = match &definition.base {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(base) => Some(interpolate(base.clone(), &self.env)?),
        };
        let children = self.resolve_base(name, type_name, store_type.shape(), base, pass)?;

        store_type.construct(BuildRequest {
            name: name.to_string(),
            type_name: type_name.to_string(),
            config,
            children,
        })
    }

    fn resolve_base(
        &self,
        name: &str,
        type_name: &str,
        shape: &BaseShape,
        base: Option<Value>,
        pass: &mut Resolution,
    ) -> ConfigResult<Children> {
        match (shape, base) {
            (BaseShape::Leaf, None) => Ok(Children::None),
            (_, None) => Err(ConfigError::InvalidConfig {
                store: name.to_string(),
                message: format!("{type_name} requires a base store"),
            }),
            (BaseShape::Single, Some(Value::String(child))) => {
                Ok(Children::Single(self.resolve(&child, pass)?))
            }
            (BaseShape::List, Some(Value::Array(items))) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(child) => children.push(self.resolve(&child, pass)?),
                        other => return Err(invalid_base(type_name, &other)),
                    }
                }
                Ok(Children::List(children))
            }
            (BaseShape::Roles(roles), Some(Value::Object(map))) => {
                if map.len() != roles.len() || roles.iter().any(|role| !map.contains_key(role)) {
                    let given: Vec<&str> = map.keys().map(String::as_str).collect();
                    return Err(ConfigError::InvalidConfig {
                        store: name.to_string(),
                        message: format!(
                            "base roles must be exactly [{}], got [{}]",
                            roles.join(", "),
                            given.join(", ")
                        ),
                    });
                }
                let mut children = BTreeMap::new();
                for role in roles {
                    match &map[role] {
                        Value::String(child) => {
                            children.insert(role.clone(), self.resolve(child, pass)?);
                        }
                        other => return Err(invalid_base(type_name, other)),
                    }
                }
                Ok(Children::Roles(children))
            }
            (_, Some(other)) => Err(invalid_base(type_name, &other)),
        }
    }
}

/// State of one `build()` call.
#[derive(Default)]
struct Resolution {
    /// Definitions under construction, outermost first.
    chain: Vec<String>,
    /// Every definition reached so far.
    visited: HashSet<String>,
}

fn invalid_base(type_name: &str, found: &Value) -> ConfigError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    };
    ConfigError::InvalidBase {
        store_type: type_name.to_string(),
        found: found.to_string(),
    }
}
