//! Module descriptor ingestion.
//!
//! # Responsibilities
//! - Resolve the descriptor path (explicit, configured, or default)
//! - Parse the document (JSON, then YAML)
//! - Check it is a mapping carrying a non-empty `name`
//!
//! # Design Decisions
//! - Fail fast: every problem here aborts module construction
//! - Callers may hand over an already parsed document and skip file I/O

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::schema::RuntimeConfig;

/// Descriptor file name looked up next to the executable.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "module.json";

/// Errors raised while loading a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("descriptor at {} is unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("descriptor at {} could not be parsed: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("descriptor must be a key/value mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("descriptor has no non-empty 'name'")]
    MissingName,
}

/// Static identity of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleIdentity {
    name: String,
    document: Map<String, Value>,
}

impl ModuleIdentity {
    /// Build an identity from an already parsed document.
    pub fn from_document(document: Value) -> Result<Self, DescriptorError> {
        let document = match document {
            Value::Object(map) => map,
            other => return Err(DescriptorError::NotAMapping(kind_of(&other))),
        };

        let name = document
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DescriptorError::MissingName)?
            .to_string();

        Ok(Self { name, document })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A declared property other than the name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

/// `module.json` next to the running executable.
pub fn default_descriptor_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DESCRIPTOR_FILE)
}

/// Pick the descriptor path: explicit override, configured path, default.
pub fn resolve_descriptor_path(explicit: Option<&Path>, config: &RuntimeConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.descriptor_path.clone())
        .unwrap_or_else(default_descriptor_path)
}

/// Load and validate a descriptor file.
pub fn load_descriptor(path: &Path) -> Result<ModuleIdentity, DescriptorError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DescriptorError::NotFound(path.to_path_buf()),
        _ => DescriptorError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let document = parse_document(&content).map_err(|message| DescriptorError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    let identity = ModuleIdentity::from_document(document)?;
    tracing::debug!(path = %path.display(), name = %identity.name(), "Descriptor loaded");
    Ok(identity)
}

fn parse_document(content: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_yaml::from_str::<Value>(content)
            .map_err(|yaml_err| format!("not JSON ({}) nor YAML ({})", json_err, yaml_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_identity_from_document() {
        let identity = ModuleIdentity::from_document(json!({"name": "gauge", "version": "1.2"})).unwrap();
        assert_eq!(identity.name(), "gauge");
        assert_eq!(identity.get("version"), Some(&json!("1.2")));
    }

    #[test]
    fn test_missing_or_empty_name() {
        assert!(matches!(
            ModuleIdentity::from_document(json!({"version": 1})),
            Err(DescriptorError::MissingName)
        ));
        assert!(matches!(
            ModuleIdentity::from_document(json!({"name": "  "})),
            Err(DescriptorError::MissingName)
        ));
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(
            ModuleIdentity::from_document(json!(["gauge"])),
            Err(DescriptorError::NotAMapping("an array"))
        ));
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "gauge", "properties": {{"color": "red"}}}}"#).unwrap();
        let identity = load_descriptor(file.path()).unwrap();
        assert_eq!(identity.name(), "gauge");
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: gauge\nproperties:\n  color: red").unwrap();
        let identity = load_descriptor(file.path()).unwrap();
        assert_eq!(identity.get("properties"), Some(&json!({"color": "red"})));
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/definitely/not/here/module.json");
        match load_descriptor(path) {
            Err(DescriptorError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_order() {
        let mut config = RuntimeConfig::default();
        assert!(resolve_descriptor_path(None, &config).ends_with(DEFAULT_DESCRIPTOR_FILE));

        config.descriptor_path = Some(PathBuf::from("/etc/gauge/module.json"));
        assert_eq!(
            resolve_descriptor_path(None, &config),
            PathBuf::from("/etc/gauge/module.json")
        );
        assert_eq!(
            resolve_descriptor_path(Some(Path::new("/tmp/override.json")), &config),
            PathBuf::from("/tmp/override.json")
        );
    }
}
