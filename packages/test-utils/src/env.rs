//! Environment defaults for test sessions
//!
//! [`EnvDefaults`] is the immutable table of variables a session guarantees.
//! Applying it only ever fills in variables that are absent; a value set by
//! the invoking environment always wins.

use std::io;
use std::path::{Path, PathBuf};

use atlas_shared_config::defaults::RECOGNIZED_DEFAULTS;
use atlas_shared_config::{EnvProvider, SystemEnv};
use thiserror::Error;

/// Whether a session wrote a variable or found it already set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOrigin {
    /// The variable was absent and the default was written
    Applied,
    /// The variable was already present and left untouched
    Preserved,
}

/// Outcome for a single variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDefault {
    pub name: String,
    /// Value in effect after the session started
    pub value: String,
    pub origin: DefaultOrigin,
}

/// Per-variable report produced by [`EnvDefaults::plan`] and [`EnvDefaults::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedDefaults {
    entries: Vec<AppliedDefault>,
}

impl AppliedDefaults {
    pub fn iter(&self) -> impl Iterator<Item = &AppliedDefault> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AppliedDefault> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Value in effect for `name`, if it is a recognised variable
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|entry| entry.value.as_str())
    }

    /// Names of the variables the session wrote
    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.with_origin(DefaultOrigin::Applied)
    }

    /// Names of the variables that were already set
    pub fn preserved(&self) -> impl Iterator<Item = &str> {
        self.with_origin(DefaultOrigin::Preserved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with_origin(&self, origin: DefaultOrigin) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |entry| entry.origin == origin)
            .map(|entry| entry.name.as_str())
    }
}

/// Table of environment variables and the defaults a session guarantees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvDefaults {
    entries: Vec<(String, String)>,
}

impl EnvDefaults {
    /// The five variables every Atlas test session provides
    pub fn standard() -> Self {
        Self::new(RECOGNIZED_DEFAULTS)
    }

    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        entries
            .into_iter()
            .fold(Self { entries: Vec::new() }, |defaults, (k, v)| {
                defaults.with(k, v)
            })
    }

    /// Add a variable, replacing the default of an existing one
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Work out what [`apply`](Self::apply) would do against `env`, without writing
    pub fn plan(&self, env: &impl EnvProvider) -> AppliedDefaults {
        let entries = self
            .entries
            .iter()
            .map(|(name, default)| match env.get(name) {
                Some(existing) => AppliedDefault {
                    name: name.clone(),
                    value: existing,
                    origin: DefaultOrigin::Preserved,
                },
                None => AppliedDefault {
                    name: name.clone(),
                    value: default.clone(),
                    origin: DefaultOrigin::Applied,
                },
            })
            .collect();
        AppliedDefaults { entries }
    }

    /// Set every absent variable in the process environment to its default
    ///
    /// Calling this again is harmless: the second pass finds everything
    /// present and reports it as preserved.
    pub fn apply(&self) -> AppliedDefaults {
        let report = self.plan(&SystemEnv);
        for entry in report.iter() {
            match entry.origin {
                DefaultOrigin::Applied => {
                    std::env::set_var(&entry.name, &entry.value);
                    tracing::debug!(name = %entry.name, value = %entry.value, "applied environment default");
                }
                DefaultOrigin::Preserved => {
                    tracing::debug!(name = %entry.name, "keeping existing environment value");
                }
            }
        }
        report
    }
}

impl Default for EnvDefaults {
    fn default() -> Self {
        Self::standard()
    }
}

/// Failure part-way through a dotenv file
///
/// Variables set before the failing line stay set; `loaded` names them.
#[derive(Debug, Error)]
#[error("failed to load env file {}: {source}", path.display())]
pub struct EnvFileError {
    pub path: PathBuf,
    pub loaded: Vec<String>,
    #[source]
    pub source: dotenvy::Error,
}

impl EnvFileError {
    pub fn is_not_found(&self) -> bool {
        matches!(&self.source, dotenvy::Error::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}

/// Load a dotenv file without overriding variables that are already set
///
/// Returns the names of the variables that were loaded from the file.
pub fn load_config_env(path: &Path) -> Result<Vec<String>, EnvFileError> {
    load_env_file(path, |_| false)
}

fn load_env_file(path: &Path, reserved: impl Fn(&str) -> bool) -> Result<Vec<String>, EnvFileError> {
    let mut loaded = Vec::new();
    let fail = |loaded: Vec<String>, source| EnvFileError {
        path: path.to_path_buf(),
        loaded,
        source,
    };

    let items = match dotenvy::from_path_iter(path) {
        Ok(items) => items,
        Err(source) => return Err(fail(loaded, source)),
    };
    for item in items {
        let (key, value) = match item {
            Ok(pair) => pair,
            Err(source) => return Err(fail(loaded, source)),
        };
        if std::env::var_os(&key).is_some() {
            if reserved(&key) {
                tracing::warn!(name = %key, path = %path.display(), "env file cannot replace a session default");
            }
            continue;
        }
        std::env::set_var(&key, value);
        loaded.push(key);
    }
    Ok(loaded)
}

/// Load the session's env file after `defaults` were applied
///
/// Names in `defaults` are already set by then, so the file never replaces
/// one of them; doing so is logged. A missing file loads nothing. A broken
/// one is logged and whatever loaded before the bad line is reported.
pub(crate) fn load_config_env_lenient(path: &Path, defaults: &EnvDefaults) -> Vec<String> {
    match load_env_file(path, |name| defaults.get(name).is_some()) {
        Ok(loaded) => loaded,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err.source,
                loaded = err.loaded.len(),
                "test env file only partly loaded"
            );
            err.loaded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_shared_config::MapEnv;
    use std::io::Write;
    use tracing_test::traced_test;

    const SCRATCH_A: &str = "ATLAS_ENV_UNIT_SCRATCH_A";
    const SCRATCH_B: &str = "ATLAS_ENV_UNIT_SCRATCH_B";

    #[test]
    fn test_standard_defaults_table() {
        let defaults = EnvDefaults::standard();
        assert_eq!(defaults.get("OLLAMA_IP"), Some("http://localhost:11434"));
        assert_eq!(defaults.get("MODEL"), Some("llama3:8b"));
        assert_eq!(defaults.get("REDIS_URL"), Some("redis://localhost:6379"));
        assert_eq!(defaults.get("ELASTICSEARCH_URL"), Some("http://localhost:9200"));
        assert_eq!(defaults.get("LOG_LEVEL"), Some("DEBUG"));
        assert_eq!(defaults.names().count(), 5);
    }

    #[test]
    fn test_with_replaces_existing_default() {
        let defaults = EnvDefaults::standard().with("MODEL", "mistral");
        assert_eq!(defaults.get("MODEL"), Some("mistral"));
        assert_eq!(defaults.names().count(), 5);
    }

    #[test]
    fn test_plan_on_empty_env_applies_everything() {
        let report = EnvDefaults::standard().plan(&MapEnv::new());
        assert_eq!(report.len(), 5);
        assert_eq!(report.applied().count(), 5);
        assert_eq!(report.preserved().count(), 0);
        assert_eq!(report.value("REDIS_URL"), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_plan_preserves_existing_values() {
        let env = MapEnv::new().with_var("REDIS_URL", "redis://prod:6380");
        let report = EnvDefaults::standard().plan(&env);

        let redis = report.get("REDIS_URL").unwrap();
        assert_eq!(redis.origin, DefaultOrigin::Preserved);
        assert_eq!(redis.value, "redis://prod:6380");
        assert_eq!(report.preserved().collect::<Vec<_>>(), vec!["REDIS_URL"]);
    }

    #[test]
    fn test_plan_preserves_empty_values() {
        let env = MapEnv::new().with_var("LOG_LEVEL", "");
        let report = EnvDefaults::standard().plan(&env);
        assert_eq!(report.get("LOG_LEVEL").unwrap().origin, DefaultOrigin::Preserved);
        assert_eq!(report.value("LOG_LEVEL"), Some(""));
    }

    #[test]
    #[traced_test]
    fn test_apply_sets_only_absent_variables() {
        let defaults = EnvDefaults::new([(SCRATCH_A, "default-a"), (SCRATCH_B, "default-b")]);
        temp_env::with_vars([(SCRATCH_A, None), (SCRATCH_B, Some("caller-b"))], || {
            let report = defaults.apply();

            assert_eq!(std::env::var(SCRATCH_A).unwrap(), "default-a");
            assert_eq!(std::env::var(SCRATCH_B).unwrap(), "caller-b");
            assert_eq!(report.applied().collect::<Vec<_>>(), vec![SCRATCH_A]);
        });
        assert!(logs_contain("applied environment default"));
        assert!(logs_contain("keeping existing environment value"));
    }

    #[test]
    fn test_apply_twice_preserves_everything() {
        let defaults = EnvDefaults::new([(SCRATCH_A, "default-a")]);
        temp_env::with_var_unset(SCRATCH_A, || {
            let first = defaults.apply();
            let second = defaults.apply();
            assert_eq!(first.applied().count(), 1);
            assert_eq!(second.applied().count(), 0);
            assert_eq!(second.value(SCRATCH_A), Some("default-a"));
        });
    }

    #[test]
    fn test_load_config_env_does_not_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}=from-file", SCRATCH_A).unwrap();
        writeln!(file, "{}=from-file", SCRATCH_B).unwrap();

        temp_env::with_vars([(SCRATCH_A, None), (SCRATCH_B, Some("caller"))], || {
            let loaded = load_config_env(file.path()).unwrap();
            assert_eq!(loaded, vec![SCRATCH_A.to_string()]);
            assert_eq!(std::env::var(SCRATCH_A).unwrap(), "from-file");
            assert_eq!(std::env::var(SCRATCH_B).unwrap(), "caller");
        });
    }

    #[test]
    fn test_load_config_env_lenient_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = EnvDefaults::standard();
        assert!(load_config_env_lenient(&dir.path().join("absent.env"), &defaults).is_empty());
    }

    #[test]
    fn test_load_config_env_reports_keys_set_before_a_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}=from-file", SCRATCH_A).unwrap();
        writeln!(file, "this line is not an assignment").unwrap();
        writeln!(file, "{}=from-file", SCRATCH_B).unwrap();

        temp_env::with_vars_unset([SCRATCH_A, SCRATCH_B], || {
            let err = load_config_env(file.path()).unwrap_err();
            assert!(!err.is_not_found());
            assert_eq!(err.loaded, vec![SCRATCH_A.to_string()]);
            assert_eq!(std::env::var(SCRATCH_A).unwrap(), "from-file");
            assert!(std::env::var_os(SCRATCH_B).is_none());

            std::env::remove_var(SCRATCH_A);
            let loaded = load_config_env_lenient(file.path(), &EnvDefaults::standard());
            assert_eq!(loaded, vec![SCRATCH_A.to_string()]);
        });
    }

    #[test]
    fn test_load_config_env_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_env(&dir.path().join("absent.env")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.loaded.is_empty());
    }

    #[test]
    #[traced_test]
    fn test_env_file_cannot_replace_applied_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}=from-file", SCRATCH_A).unwrap();
        writeln!(file, "{}=from-file", SCRATCH_B).unwrap();
        let defaults = EnvDefaults::new([(SCRATCH_A, "default-a")]);

        temp_env::with_vars_unset([SCRATCH_A, SCRATCH_B], || {
            defaults.apply();
            let loaded = load_config_env_lenient(file.path(), &defaults);

            assert_eq!(loaded, vec![SCRATCH_B.to_string()]);
            assert_eq!(std::env::var(SCRATCH_A).unwrap(), "default-a");
        });
        assert!(logs_contain("env file cannot replace a session default"));
    }
}
