//! Declarative store graphs.
//!
//! A configuration document names store definitions, each with a `type`, a
//! `config` mapping and an optional `base` naming its children. The
//! [`StoreBuilder`] resolves one definition (and, recursively, its bases)
//! into a ready store, substituting `${NAME}` / `${NAME:-default}` from the
//! environment along the way.
//!
//! ```no_run
//! use layerstore_config::StoreBuilder;
//! use layerstore_core::ObjectStore;
//!
//! # fn main() -> layerstore_config::ConfigResult<()> {
//! let builder = StoreBuilder::from_path("stores.yaml")?;
//! let store = builder.build_bytes(None)?;
//! store.put("greeting", b"hello".to_vec())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`document`] -- the parsed document ([`StoreConfig`])
//! - [`env`] -- environment interpolation
//! - [`registry`] -- type names to constructors ([`StoreRegistry`])
//! - [`builder`] -- graph resolution ([`StoreBuilder`])
//! - [`built`] -- the type-erased result ([`BuiltStore`])

pub mod builder;
pub mod built;
mod builtins;
pub mod document;
pub mod env;
pub mod error;
pub mod registry;

pub use builder::StoreBuilder;
pub use built::BuiltStore;
pub use document::{Format, StoreConfig, StoreDefinition};
pub use env::{interpolate, Environment};
pub use error::{ConfigError, ConfigResult};
pub use registry::{BaseShape, BuildRequest, Children, Factory, StoreRegistry, StoreType};
