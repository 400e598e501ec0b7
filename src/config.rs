//! `.blogrc` defaults for command-line options.
//!
//! Each non-empty line is `name:value` or a bare `name`. Bare names switch
//! on boolean flags; values fill options that were not given explicitly.

use crate::error::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".blogrc";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcConfig {
    entries: Vec<(String, String)>,
}

impl RcConfig {
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match line.split_once(':') {
                Some((name, value)) => (name.trim().to_string(), value.to_string()),
                None => (line.to_string(), String::new()),
            })
            .collect();
        Self { entries }
    }

    /// Loads `path`; a missing file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Io` if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loaded config file");
                Ok(Self::parse(&content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Last value given for `name`
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `name` appears at all, with or without a value
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Fills `slot` from `name` unless it already holds a value.
    pub fn fill<T: From<String>>(&self, name: &str, slot: &mut Option<T>) {
        if slot.is_none()
            && let Some(value) = self.value(name)
        {
            *slot = Some(T::from(value.to_string()));
        }
    }

    /// Turns on `flag` when `name` is present.
    pub fn fill_flag(&self, name: &str, flag: &mut bool) {
        if self.flag(name) {
            *flag = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_parse() {
        let config = RcConfig::parse("username:me\n\nblog:My Blog: Notes\ndraft\n");
        assert_eq!(config.value("username"), Some("me"));
        assert_eq!(config.value("blog"), Some("My Blog: Notes"));
        assert!(config.flag("draft"));
        assert!(!config.flag("update"));
        assert_eq!(config.value("missing"), None);
    }

    #[test]
    fn test_fill_keeps_explicit_values() {
        let config = RcConfig::parse("blog:from-config\nusername:someone\ntemplate:base.html");

        let mut blog = Some("from-cli".to_string());
        config.fill("blog", &mut blog);
        assert_eq!(blog.as_deref(), Some("from-cli"));

        let mut username: Option<String> = None;
        config.fill("username", &mut username);
        assert_eq!(username.as_deref(), Some("someone"));

        let mut template: Option<PathBuf> = None;
        config.fill("template", &mut template);
        assert_eq!(template, Some(PathBuf::from("base.html")));

        let mut token: Option<String> = None;
        config.fill("token", &mut token);
        assert_eq!(token, None);
    }

    #[test]
    fn test_fill_flag() {
        let config = RcConfig::parse("update\ndraft:yes");
        let mut update = false;
        let mut draft = false;
        config.fill_flag("update", &mut update);
        config.fill_flag("draft", &mut draft);
        assert!(update);
        assert!(draft);
    }

    #[test]
    fn test_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".blogrc");

        assert_eq!(RcConfig::load(&path).unwrap(), RcConfig::default());

        fs::write(&path, "blog:Daily\n").unwrap();
        assert_eq!(RcConfig::load(&path).unwrap().value("blog"), Some("Daily"));
    }
}
