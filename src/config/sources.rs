//! Config-file source discovery.
//!
//! Source order implements the precedence contract:
//! explicit path > local file > global file > built-in defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ConfigSource {
    /// Config loaded from explicit `--config` path.
    Explicit(PathBuf),
    /// Config loaded from `./command-agent.toml`.
    Local,
    /// Config loaded from the per-user config directory.
    Global(PathBuf),
    /// No file found; runtime defaults were used.
    BuiltInDefaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) | Self::Global(path) => write!(f, "{}", path.display()),
            Self::Local => write!(f, "./{CONFIG_FILE_NAME}"),
            Self::BuiltInDefaults => write!(f, "built-in defaults"),
        }
    }
}

/// Read config text from the highest-precedence available source.
pub(super) fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    // An explicit path must exist; silently falling back would hide typos.
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, ConfigSource::Explicit(path)));
    }

    if let Ok(text) = read_file(Path::new(CONFIG_FILE_NAME)) {
        return Ok((text, ConfigSource::Local));
    }
    if let Some(dir) = config_root() {
        let global = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if let Ok(text) = read_file(&global) {
            return Ok((text, ConfigSource::Global(global)));
        }
    }

    Ok((String::new(), ConfigSource::BuiltInDefaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn not_found(_: &Path) -> Result<String, io::Error> {
        Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
    }

    #[test]
    fn explicit_path_wins_and_must_exist() {
        let err = read_config_text_with_sources(Some("/nope.toml"), &not_found, &|| None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));

        let (text, source) = read_config_text_with_sources(
            Some("/etc/custom.toml"),
            &|_: &Path| Ok("[session]".to_string()),
            &|| None,
        )
        .unwrap();
        assert_eq!(text, "[session]");
        assert_eq!(source, ConfigSource::Explicit(PathBuf::from("/etc/custom.toml")));
    }

    #[test]
    fn global_file_used_when_no_local_file() {
        let read = |path: &Path| {
            if path.ends_with("command-agent/command-agent.toml") {
                Ok("[display]\ncolor = false".to_string())
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
            }
        };
        let (_, source) =
            read_config_text_with_sources(None, &read, &|| Some(PathBuf::from("/home/op/.config")))
                .unwrap();
        assert_eq!(
            source,
            ConfigSource::Global(PathBuf::from(
                "/home/op/.config/command-agent/command-agent.toml"
            ))
        );
    }

    #[test]
    fn falls_back_to_defaults() {
        let (text, source) = read_config_text_with_sources(None, &not_found, &|| None).unwrap();
        assert!(text.is_empty());
        assert_eq!(source, ConfigSource::BuiltInDefaults);
        assert_eq!(source.to_string(), "built-in defaults");
    }
}
