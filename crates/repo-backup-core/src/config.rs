use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

/// Which implementation packages a bucket into a tar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiverKind {
    /// Shell out to the external `tar` program.
    #[default]
    System,
    /// Write the archive in-process with the `tar` crate.
    Builtin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding the `node/` section of the file repository.
    pub repository_path: Option<PathBuf>,
    /// SQLite file with the node catalog.
    pub catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub archiver: ArchiverKind,
    #[serde(default = "default_tar_program")]
    pub tar_program: String,
    #[serde(default = "default_lock_destination")]
    pub lock_destination: bool,
}

fn default_tar_program() -> String {
    "tar".to_string()
}

fn default_lock_destination() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repository_path: None,
            catalog_path: None,
            ignore_patterns: Vec::new(),
            archiver: ArchiverKind::default(),
            tar_program: default_tar_program(),
            lock_destination: default_lock_destination(),
        }
    }
}

/// Load `Config.toml` (optional) and `REPO_BACKUP_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("REPO_BACKUP")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Merge exclusion patterns from the config file with the ones passed on the
/// command line, keeping first-seen order and dropping repeats.
pub fn merge_ignore_patterns(configured: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(configured.len() + extra.len());
    for pattern in configured.iter().chain(extra) {
        if !merged.contains(pattern) {
            merged.push(pattern.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_ignore_patterns_keeps_order() {
        let configured = vec!["*.pyc".to_string(), "_scheduler-stdout.txt".to_string()];
        let extra = vec!["*.pyc".to_string(), "core.*".to_string()];
        let merged = merge_ignore_patterns(&configured, &extra);
        assert_eq!(
            merged,
            vec![
                "*.pyc".to_string(),
                "_scheduler-stdout.txt".to_string(),
                "core.*".to_string(),
            ]
        );
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.archiver, ArchiverKind::System);
        assert_eq!(config.tar_program, "tar");
        assert!(config.lock_destination);
        assert!(config.repository_path.is_none());
    }

    #[test]
    fn test_deserialize_from_toml_source() {
        let config = Config::builder()
            .add_source(config::File::from_str(
                r#"
                repository_path = "/srv/aiida/repository"
                catalog_path = "/srv/aiida/catalog.db"
                ignore_patterns = ["*.pyc"]
                archiver = "builtin"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(
            app.repository_path,
            Some(PathBuf::from("/srv/aiida/repository"))
        );
        assert_eq!(app.archiver, ArchiverKind::Builtin);
        assert_eq!(app.ignore_patterns, vec!["*.pyc".to_string()]);
        assert!(app.lock_destination);
    }
}
