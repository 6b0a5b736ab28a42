use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::ContextRule;
use crate::engine::Engine;

#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    Invalid(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "failed to read settings {}: {}", path.display(), source)
            }
            SettingsError::Parse { path, message } => {
                write!(f, "failed to parse settings {}: {}", path.display(), message)
            }
            SettingsError::Invalid(msg) => write!(f, "invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

pub type SettingsResult<T> = Result<T, SettingsError>;

fn parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Run configuration. Every field has a default, so a settings file only
/// needs to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Wrap width, `None` for the engine default.
    pub line_length: Option<usize>,
    pub line_tolerance: usize,
    pub file_workers: usize,
    pub block_workers: usize,
    pub source_language: String,
    pub target_language: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub dictionary_dir: PathBuf,
    /// Extra rules checked before the built-in table of each engine.
    pub context_rules: HashMap<Engine, Vec<ContextRule>>,
}

impl Default for Settings {
    fn default() -> Self {
        let cpus = parallelism();
        Settings {
            line_length: None,
            line_tolerance: 5,
            file_workers: cpus / 2 + 1,
            block_workers: cpus * 2 + 1,
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            endpoint: "http://127.0.0.1:3000/api/translate".to_string(),
            timeout_secs: 30,
            dictionary_dir: PathBuf::from("database"),
            context_rules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Reads a JSON settings file on top of the defaults.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Settings::from_json(&content).map_err(|e| match e {
            SettingsError::Parse { message, .. } => SettingsError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> SettingsResult<Self> {
        serde_json::from_str(content).map_err(|e| SettingsError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.line_length == Some(0) {
            return Err(SettingsError::Invalid("line length must be at least 1".to_string()));
        }
        if self.file_workers == 0 || self.block_workers == 0 {
            return Err(SettingsError::Invalid(
                "worker counts must be at least 1".to_string(),
            ));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(SettingsError::Invalid("languages must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(SettingsError::Invalid("timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }

    pub fn rules_for(&self, engine: Engine) -> &[ContextRule] {
        self.context_rules
            .get(&engine)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Verdict;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.line_length, None);
        assert_eq!(settings.line_tolerance, 5);
        assert!(settings.file_workers >= 1);
        assert!(settings.block_workers >= 3);
        assert_eq!(settings.source_language, "ja");
        assert_eq!(settings.target_language, "en");
        assert_eq!(settings.dictionary_dir, PathBuf::from("database"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_json(r#"{"line_length": 50, "target_language": "de"}"#).unwrap();
        assert_eq!(settings.line_length, Some(50));
        assert_eq!(settings.target_language, "de");
        assert_eq!(settings.line_tolerance, 5);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_context_rules_from_json() {
        let settings = Settings::from_json(
            r#"{"context_rules": {"wolf": [{"matcher": {"suffix": "/Picture"}, "verdict": "deny"}]}}"#,
        )
        .unwrap();
        let rules = settings.rules_for(Engine::Wolf);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].verdict, Verdict::Deny);
        assert!(settings.rules_for(Engine::VxAce).is_empty());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.block_workers = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

        let mut settings = Settings::default();
        settings.line_length = Some(0);
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.target_language = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(Settings::load(&missing), Err(SettingsError::Io { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ nope").unwrap();
        match Settings::load(&broken) {
            Err(SettingsError::Parse { path, .. }) => assert_eq!(path, broken),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }
}
