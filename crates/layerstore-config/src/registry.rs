//! Store type registry.
//!
//! A registry maps type names used in configuration documents to a
//! [`StoreType`]: the shape of `base` the type accepts and a factory that
//! turns resolved parameters and children into a [`BuiltStore`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use layerstore_core::{DynAsyncStore, DynStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::built::BuiltStore;
use crate::error::{ConfigError, ConfigResult};

/// The `base` shapes a store type accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseShape {
    /// No children; `base` must be absent.
    Leaf,
    /// One child named by a string.
    Single,
    /// An ordered list of children.
    List,
    /// A mapping from each of these role names to a child.
    Roles(Vec<String>),
}

impl BaseShape {
    pub fn roles<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BaseShape::Roles(names.into_iter().map(Into::into).collect())
    }
}

/// Resolved children, in the shape the type declared.
#[derive(Debug, Default)]
pub enum Children {
    #[default]
    None,
    Single(BuiltStore),
    List(Vec<BuiltStore>),
    Roles(BTreeMap<String, BuiltStore>),
}

/// Everything a factory needs to construct one definition.
#[derive(Debug)]
pub struct BuildRequest {
    /// Definition name, for error messages and logging.
    pub name: String,
    pub type_name: String,
    /// The interpolated `config` mapping.
    pub config: Value,
    pub children: Children,
}

impl BuildRequest {
    /// Deserialize `config` into the type's parameter struct.
    pub fn params<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(self.config.clone()).map_err(|e| self.invalid(e))
    }

    pub fn invalid(&self, message: impl fmt::Display) -> ConfigError {
        ConfigError::InvalidConfig {
            store: self.name.clone(),
            message: message.to_string(),
        }
    }

    /// The single child.
    pub fn base(&mut self) -> ConfigResult<BuiltStore> {
        match std::mem::take(&mut self.children) {
            Children::Single(child) => Ok(child),
            _ => Err(self.invalid("expected a single base store")),
        }
    }

    pub fn base_bytes(&mut self) -> ConfigResult<DynStore> {
        let name = self.name.clone();
        self.base()?.into_bytes(&name)
    }

    pub fn base_async(&mut self) -> ConfigResult<DynAsyncStore> {
        let name = self.name.clone();
        self.base()?.into_async_bytes(&name)
    }

    /// The list children.
    pub fn children(&mut self) -> ConfigResult<Vec<BuiltStore>> {
        match std::mem::take(&mut self.children) {
            Children::List(children) => Ok(children),
            _ => Err(self.invalid("expected a list of base stores")),
        }
    }

    pub fn children_bytes(&mut self) -> ConfigResult<Vec<DynStore>> {
        let name = self.name.clone();
        self.children()?
            .into_iter()
            .map(|child| child.into_bytes(&name))
            .collect()
    }

    pub fn children_async(&mut self) -> ConfigResult<Vec<DynAsyncStore>> {
        let name = self.name.clone();
        self.children()?
            .into_iter()
            .map(|child| child.into_async_bytes(&name))
            .collect()
    }

    /// Remove and return the child injected under `role`.
    pub fn role(&mut self, role: &str) -> ConfigResult<BuiltStore> {
        let child = match &mut self.children {
            Children::Roles(roles) => roles.remove(role),
            _ => None,
        };
        child.ok_or_else(|| self.invalid(format!("missing base store for role {role}")))
    }

    pub fn role_bytes(&mut self, role: &str) -> ConfigResult<DynStore> {
        let name = self.name.clone();
        self.role(role)?.into_bytes(&name)
    }

    pub fn role_async(&mut self, role: &str) -> ConfigResult<DynAsyncStore> {
        let name = self.name.clone();
        self.role(role)?.into_async_bytes(&name)
    }
}

/// Constructor behind a registered type name.
pub type Factory = Arc<dyn Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync>;

/// A registered store type.
#[derive(Clone)]
pub struct StoreType {
    shape: BaseShape,
    factory: Factory,
}

impl StoreType {
    pub fn new<F>(shape: BaseShape, factory: F) -> Self
    where
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self {
            shape,
            factory: Arc::new(factory),
        }
    }

    /// A type without children.
    pub fn leaf<F>(factory: F) -> Self
    where
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self::new(BaseShape::Leaf, factory)
    }

    pub fn single<F>(factory: F) -> Self
    where
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self::new(BaseShape::Single, factory)
    }

    pub fn list<F>(factory: F) -> Self
    where
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self::new(BaseShape::List, factory)
    }

    pub fn roles<I, S, F>(roles: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self::new(BaseShape::roles(roles), factory)
    }

    /// A new type that resolves `base` exactly like `existing`.
    pub fn like<F>(existing: &StoreType, factory: F) -> Self
    where
        F: Fn(BuildRequest) -> ConfigResult<BuiltStore> + Send + Sync + 'static,
    {
        Self::new(existing.shape.clone(), factory)
    }

    pub fn shape(&self) -> &BaseShape {
        &self.shape
    }

    pub fn construct(&self, request: BuildRequest) -> ConfigResult<BuiltStore> {
        (self.factory)(request)
    }
}

impl fmt::Debug for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreType")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Type name to [`StoreType`].
#[derive(Clone, Debug, Default)]
pub struct StoreRegistry {
    types: BTreeMap<String, StoreType>,
}

impl StoreRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in backend and decorator.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_builtins(&mut registry);
        registry
    }

    /// Register `store_type` under `name`.
    ///
    /// An existing registration is replaced and returned.
    pub fn register(&mut self, name: impl Into<String>, store_type: StoreType) -> Option<StoreType> {
        let name = name.into();
        let previous = self.types.insert(name.clone(), store_type);
        if previous.is_some() {
            debug!(store_type = %name, "replaced store type registration");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&StoreType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
