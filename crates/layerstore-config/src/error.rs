use layerstore_core::StoreError;
use thiserror::Error;

/// Errors from loading a configuration document or building a store graph.
///
/// Any of these aborts the whole build; no partial graph is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A base or the requested root names a definition that does not exist.
    #[error("store definition not found: {0}")]
    UnknownStore(String),

    /// A definition uses a type the registry does not know.
    #[error("unknown store type '{type_name}' in definition {store}")]
    UnknownType { store: String, type_name: String },

    /// A definition is (directly or transitively) its own base.
    #[error(
        "recursive store definition found -- {name} mentioned multiple times ({})",
        .chain.join(" -> ")
    )]
    Cycle { name: String, chain: Vec<String> },

    /// `${NAME}` referenced an unset variable and gave no default.
    #[error(
        "environment variable '{0}' not found. Please set {0} or provide a default value using ${{{0}:-default}}"
    )]
    MissingEnv(String),

    /// The `base` of a definition has a shape its type does not accept.
    #[error("invalid base store configuration for {store_type}: base store definition is a {found}")]
    InvalidBase { store_type: String, found: String },

    /// The `config` of a definition could not be turned into the type's parameters.
    #[error("invalid configuration for store {store}: {message}")]
    InvalidConfig { store: String, message: String },

    /// A built store's value type does not fit where it is used.
    #[error("store {store} is a {found} store, expected {expected}")]
    TypeMismatch {
        store: String,
        expected: &'static str,
        found: &'static str,
    },

    /// No name was given and the document has no `main`.
    #[error("no store name given and no main store configured")]
    MissingMain,

    /// The document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store constructor rejected its parameters.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_message_names_the_default_syntax() {
        let err = ConfigError::MissingEnv("MISSING".into());
        assert_eq!(
            err.to_string(),
            "environment variable 'MISSING' not found. Please set MISSING or provide a default value using ${MISSING:-default}"
        );
    }

    #[test]
    fn cycle_message_includes_chain() {
        let err = ConfigError::Cycle {
            name: "a".into(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "recursive store definition found -- a mentioned multiple times (a -> b -> a)"
        );
    }

    #[test]
    fn store_errors_convert() {
        let err: ConfigError = StoreError::Configuration("bad level".into()).into();
        assert!(matches!(err, ConfigError::Store(_)));
    }
}
