use clientgen_schema::{resolve::ResolveOptions, share::ClassifierConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// Language served by the built-in backend.
pub const DEFAULT_LANGUAGE: &str = "rust";

///
/// OptionsError
///

#[derive(Debug, ThisError)]
pub enum OptionsError {
    #[error("invalid generation options: {0}")]
    Invalid(String),

    #[error("could not read generation options from '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse generation options: {0}")]
    Parse(#[from] serde_json::Error),
}

///
/// GenerationOptions
///
/// Per-request configuration. Every field has a default, so an empty JSON
/// object is a valid configuration.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Target client language, matched case-insensitively.
    pub language: String,

    /// Explicit backend: a registered name or a fully-qualified type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    /// Namespace prefix stripped from emitted module paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_root_namespace: Option<String>,

    /// Where the host writes the generated text; used in diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_output: Option<PathBuf>,

    /// Plugin sources scanned for extra backends, in order.
    pub plugin_sources: Vec<String>,

    /// Emit an informational note when no backend matched the language.
    pub report_default_selection: bool,

    #[serde(flatten)]
    pub resolve: ResolveOptions,

    #[serde(flatten)]
    pub sharing: ClassifierConfig,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            generator: None,
            client_root_namespace: None,
            client_output: None,
            plugin_sources: Vec::new(),
            report_default_selection: false,
            resolve: ResolveOptions::default(),
            sharing: ClassifierConfig::default(),
        }
    }
}

impl GenerationOptions {
    pub fn from_json(text: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;

        Ok(options)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.language.trim().is_empty() {
            return Err(OptionsError::Invalid("language must not be empty".into()));
        }
        if self.resolve.max_projection_depth == 0 {
            return Err(OptionsError::Invalid(
                "max_projection_depth must be at least 1".into(),
            ));
        }
        if self.generator.as_deref().is_some_and(|g| g.trim().is_empty()) {
            return Err(OptionsError::Invalid("generator must not be blank".into()));
        }

        Ok(())
    }

    /// Display form of the output location for diagnostics.
    #[must_use]
    pub fn output_display(&self) -> String {
        self.client_output
            .as_ref()
            .map_or_else(|| "<unspecified>".to_string(), |p| p.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clientgen_schema::{DEFAULT_MAX_PROJECTION_DEPTH, resolve::RawAssociationPolicy};

    #[test]
    fn empty_object_uses_defaults() {
        let options = GenerationOptions::from_json("{}").unwrap();
        assert_eq!(options, GenerationOptions::default());
        assert_eq!(options.resolve.max_projection_depth, DEFAULT_MAX_PROJECTION_DEPTH);
    }

    #[test]
    fn flattened_sections_parse() {
        let options = GenerationOptions::from_json(
            r#"{
                "language": "TypeScript",
                "generator": "Acme.Generators.TsBackend",
                "plugin_sources": ["plugins/acme"],
                "max_projection_depth": 3,
                "raw_association_policy": "strip",
                "common_namespaces": ["System"],
                "client_sources": ["shared/money.rs"]
            }"#,
        )
        .unwrap();

        assert_eq!(options.language, "TypeScript");
        assert_eq!(options.generator.as_deref(), Some("Acme.Generators.TsBackend"));
        assert_eq!(options.resolve.max_projection_depth, 3);
        assert_eq!(options.resolve.raw_association_policy, RawAssociationPolicy::Strip);
        assert_eq!(options.sharing.common_namespaces, ["System"]);
        assert_eq!(options.sharing.client_sources, [PathBuf::from("shared/money.rs")]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            GenerationOptions::from_json(r#"{"max_projection_depth": 0}"#),
            Err(OptionsError::Invalid(_))
        ));
        assert!(matches!(
            GenerationOptions::from_json(r#"{"language": " "}"#),
            Err(OptionsError::Invalid(_))
        ));
        assert!(matches!(
            GenerationOptions::from_json("not json"),
            Err(OptionsError::Parse(_))
        ));
    }
}
