use crate::backend::BackendFactory;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// LoadError
///

#[derive(Clone, Debug, ThisError)]
pub enum LoadError {
    /// The source could not be loaded at all.
    #[error("could not load plugin source '{source_name}': {message}")]
    Load {
        source_name: String,
        message: String,
    },

    /// Some types in the source failed to load; `loaded` holds the rest.
    #[error("some backend types in plugin source '{source_name}' failed to load: {message}")]
    TypeLoad {
        source_name: String,
        message: String,
        loaded: Vec<BackendFactory>,
    },
}

///
/// BackendLoader
///
/// Host hook for discovering plugin backends. Each source is scanned in
/// its own failure boundary.
///

pub trait BackendLoader {
    fn scan(&self, source: &str) -> Result<Vec<BackendFactory>, LoadError>;

    /// Load a backend directly by fully-qualified type identifier.
    fn load_type(&self, type_id: &str) -> Option<BackendFactory>;
}

///
/// NullLoader
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NullLoader;

impl BackendLoader for NullLoader {
    fn scan(&self, source: &str) -> Result<Vec<BackendFactory>, LoadError> {
        Err(LoadError::Load {
            source_name: source.to_string(),
            message: "plugin loading is not available".to_string(),
        })
    }

    fn load_type(&self, _: &str) -> Option<BackendFactory> {
        None
    }
}

///
/// StaticLoader
/// In-memory loader; unknown sources fail to load.
///

#[derive(Clone, Debug, Default)]
pub struct StaticLoader {
    sources: BTreeMap<String, Result<Vec<BackendFactory>, LoadError>>,
    types: BTreeMap<String, BackendFactory>,
}

impl StaticLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, factories: Vec<BackendFactory>) -> Self {
        self.sources.insert(source.into(), Ok(factories));
        self
    }

    #[must_use]
    pub fn with_failure(mut self, source: impl Into<String>, error: LoadError) -> Self {
        self.sources.insert(source.into(), Err(error));
        self
    }

    /// Make a backend loadable by type identifier without any source.
    #[must_use]
    pub fn with_type(mut self, factory: BackendFactory) -> Self {
        self.types
            .insert(factory.descriptor().type_id.clone(), factory);
        self
    }
}

impl BackendLoader for StaticLoader {
    fn scan(&self, source: &str) -> Result<Vec<BackendFactory>, LoadError> {
        self.sources.get(source).cloned().unwrap_or_else(|| {
            Err(LoadError::Load {
                source_name: source.to_string(),
                message: "source not found".to_string(),
            })
        })
    }

    fn load_type(&self, type_id: &str) -> Option<BackendFactory> {
        self.types.get(type_id).cloned().or_else(|| {
            self.sources
                .values()
                .filter_map(|r| r.as_ref().ok())
                .flatten()
                .find(|f| f.descriptor().type_id == type_id)
                .cloned()
        })
    }
}
