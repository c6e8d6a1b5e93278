use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::input::Keymap;

pub const DEFAULT_SCROLL_STEP: i64 = 200;
pub const DEFAULT_PAGE_GAP: usize = 30;

/// User settings read from `config.toml`. Every field is optional.
///
/// ```toml
/// scroll_step = 120
/// page_gap = 24
/// gap_color = 0xff202020
///
/// [keymap]
/// space = "scroll:+3"
/// q = "none"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub scroll_step: i64,
    pub page_gap: usize,
    pub gap_color: u32,
    pub background: u32,
    pub keymap: BTreeMap<String, String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scroll_step: DEFAULT_SCROLL_STEP,
            page_gap: DEFAULT_PAGE_GAP,
            gap_color: 0,
            background: 0,
            keymap: BTreeMap::new(),
        }
    }
}

impl ViewerConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(?path, "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn keymap(&self) -> Keymap {
        Keymap::with_overrides(&self.keymap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Action, Key};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.scroll_step, 200);
        assert_eq!(config.page_gap, 30);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "scroll_step = 120\ngap_color = 0xff202020\n\n[keymap]\nspace = \"scroll:+3\"\n",
        )
        .unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.scroll_step, 120);
        assert_eq!(config.page_gap, 30);
        assert_eq!(config.gap_color, 0xff20_2020);

        let keymap = config.keymap();
        assert_eq!(keymap.action(Key::Char(' ')), Some(Action::Scroll { steps: 3 }));
        assert_eq!(keymap.action(Key::PageDown), Some(Action::Scroll { steps: 3 }));
    }

    #[test]
    fn invalid_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scroll_step = \"fast\"\n").unwrap();

        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
