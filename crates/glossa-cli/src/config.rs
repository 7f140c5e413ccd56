//! Optional JSON configuration for `glossa check`, merged with command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use glossa_types::{FixMode, GlossaError, Result, RunOptions};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "glossa.json";

/// On-disk configuration. Every field is optional; unknown fields are an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub languages: Vec<String>,
    pub fix_mode: Option<FixMode>,
    pub rerun_after_fix: Option<bool>,
    pub hard_fail_on_error: Option<bool>,
    pub keep_going: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| GlossaError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| GlossaError::Config(format!("invalid config {}: {e}", path.display())))
    }
}

/// Load `explicit` if given (it must exist), else `glossa.json` in `dir` if present.
pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Option<(PathBuf, FileConfig)>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(None);
            }
            candidate
        }
    };
    let config = FileConfig::load(&path)?;
    Ok(Some((path, config)))
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub languages: Vec<String>,
    pub fix_mode: Option<FixMode>,
    pub no_rerun: bool,
    pub hard_fail: bool,
    pub keep_going: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub languages: Vec<String>,
    pub options: RunOptions,
    pub keep_going: bool,
}

/// Merge file values with flags; flags win. Boolean flags can only switch a
/// behavior on, so `--no-rerun` is the one way to turn revalidation off.
pub fn resolve(file: Option<FileConfig>, cli: &Overrides) -> Settings {
    let file = file.unwrap_or_default();
    let defaults = RunOptions::default();

    let languages = if cli.languages.is_empty() {
        file.languages
    } else {
        cli.languages.clone()
    };
    let rerun_after_fix = if cli.no_rerun {
        false
    } else {
        file.rerun_after_fix.unwrap_or(defaults.rerun_after_fix)
    };
    let options = RunOptions {
        fix_mode: cli.fix_mode.or(file.fix_mode).unwrap_or(defaults.fix_mode),
        rerun_after_fix,
        hard_fail_on_error: cli.hard_fail || file.hard_fail_on_error.unwrap_or(false),
    };
    Settings {
        languages,
        options,
        keep_going: cli.keep_going || file.keep_going.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "c.json",
            r#"{"languages":["en","de"],"fix_mode":"if-not-passing","rerun_after_fix":false,
                "hard_fail_on_error":true,"keep_going":true}"#,
        );
        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.languages, ["en", "de"]);
        assert_eq!(config.fix_mode, Some(FixMode::IfNotPassing));
        assert_eq!(config.rerun_after_fix, Some(false));
        assert_eq!(config.hard_fail_on_error, Some(true));
        assert_eq!(config.keep_going, Some(true));
    }

    #[test]
    fn underscore_fix_mode_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "c.json", r#"{"fix_mode":"only_if_failed"}"#);
        assert_eq!(FileConfig::load(&path).unwrap().fix_mode, Some(FixMode::OnlyIfFailed));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "c.json", r#"{"fixmode":"always"}"#);
        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, GlossaError::Config(_)));
        assert!(err.to_string().contains("fixmode"), "{err}");
    }

    #[test]
    fn discover_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), DEFAULT_CONFIG_FILE, r#"{"languages":["fr"]}"#);
        let explicit = write(dir.path(), "other.json", r#"{"languages":["it"]}"#);
        let (path, config) = discover(Some(&explicit), dir.path()).unwrap().unwrap();
        assert_eq!(path, explicit);
        assert_eq!(config.languages, ["it"]);

        let (_, config) = discover(None, dir.path()).unwrap().unwrap();
        assert_eq!(config.languages, ["fr"]);
    }

    #[test]
    fn discover_without_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(None, dir.path()).unwrap().is_none());
        assert!(discover(Some(&dir.path().join("missing.json")), dir.path()).is_err());
    }

    #[test]
    fn defaults_without_config() {
        let settings = resolve(None, &Overrides::default());
        assert_eq!(settings.options, RunOptions::default());
        assert!(settings.languages.is_empty());
        assert!(!settings.keep_going);
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            languages: vec!["en".into()],
            fix_mode: Some(FixMode::Always),
            rerun_after_fix: Some(true),
            hard_fail_on_error: Some(false),
            keep_going: Some(false),
        };
        let cli = Overrides {
            languages: vec!["de".into()],
            fix_mode: Some(FixMode::OnlyIfFailed),
            no_rerun: true,
            hard_fail: true,
            keep_going: true,
        };
        let settings = resolve(Some(file), &cli);
        assert_eq!(settings.languages, ["de"]);
        assert_eq!(settings.options.fix_mode, FixMode::OnlyIfFailed);
        assert!(!settings.options.rerun_after_fix);
        assert!(settings.options.hard_fail_on_error);
        assert!(settings.keep_going);
    }

    #[test]
    fn file_fills_unset_flags() {
        let file = FileConfig {
            languages: vec!["en".into()],
            fix_mode: Some(FixMode::IfNotPassing),
            rerun_after_fix: Some(false),
            hard_fail_on_error: Some(true),
            keep_going: None,
        };
        let settings = resolve(Some(file), &Overrides::default());
        assert_eq!(settings.languages, ["en"]);
        assert_eq!(settings.options.fix_mode, FixMode::IfNotPassing);
        assert!(!settings.options.rerun_after_fix);
        assert!(settings.options.hard_fail_on_error);
    }
}
