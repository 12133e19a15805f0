//! Engine configuration.
//!
//! Parses `modal.toml` (or an override path provided by the host),
//! extracting the editing options: `shift_width`, `expand_tab` and
//! `auto_indent`. Loading is best-effort: a missing or unparsable file
//! falls back to defaults so the engine always starts. Unknown fields are
//! ignored (TOML deserialization tolerance) to allow forward evolution.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Columns added or removed by `>`/`<`; also the extra indent after `{`.
    #[serde(default = "EngineConfig::default_shift_width")]
    pub shift_width: usize,
    /// Indent with spaces (true) or a literal tab.
    #[serde(default = "EngineConfig::default_expand_tab")]
    pub expand_tab: bool,
    /// Carry leading whitespace onto new lines split in insert mode.
    #[serde(default = "EngineConfig::default_auto_indent")]
    pub auto_indent: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shift_width: Self::default_shift_width(),
            expand_tab: Self::default_expand_tab(),
            auto_indent: Self::default_auto_indent(),
        }
    }
}

impl EngineConfig {
    const fn default_shift_width() -> usize {
        4
    }
    const fn default_expand_tab() -> bool {
        true
    }
    const fn default_auto_indent() -> bool {
        true
    }

    /// One level of indentation as text: `shift_width` spaces, or a tab
    /// when `expand_tab` is off.
    pub fn indent_unit(&self) -> String {
        if self.expand_tab {
            " ".repeat(self.shift_width)
        } else {
            "\t".to_string()
        }
    }
}

/// Best-effort config path following platform conventions (XDG / AppData
/// Roaming), preferring a local working-directory `modal.toml`.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("modal.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("modal").join("modal.toml");
    }
    PathBuf::from("modal.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<EngineConfig> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<EngineConfig>(&content) {
            Ok(config) => {
                info!(
                    target: "config",
                    path = %path.display(),
                    shift_width = config.shift_width,
                    expand_tab = config.expand_tab,
                    auto_indent = config.auto_indent,
                    "config_loaded"
                );
                Ok(config)
            }
            // On parse error fall back to defaults so startup never fails.
            Err(_e) => Ok(EngineConfig::default()),
        }
    } else {
        Ok(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.shift_width, 4);
        assert!(cfg.expand_tab);
        assert!(cfg.auto_indent);
    }

    #[test]
    fn parses_editing_options() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "shift_width = 2\nexpand_tab = false\nauto_indent = false\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.shift_width, 2);
        assert!(!cfg.expand_tab);
        assert!(!cfg.auto_indent);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "shift_width = 8\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.shift_width, 8);
        assert!(cfg.expand_tab);
        assert!(cfg.auto_indent);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "shift_width = \"nope").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn successful_load_logs_under_config_target() {
        use std::io::Write;
        use std::sync::{Arc, Mutex, MutexGuard};
        use tracing::Level;
        use tracing::subscriber::with_default;
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct BufferWriter {
            inner: Arc<Mutex<Vec<u8>>>,
        }

        struct LockedWriter<'a> {
            guard: MutexGuard<'a, Vec<u8>>,
        }

        impl Write for LockedWriter<'_> {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.guard.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl<'a> MakeWriter<'a> for BufferWriter {
            type Writer = LockedWriter<'a>;

            fn make_writer(&'a self) -> Self::Writer {
                LockedWriter {
                    guard: self.inner.lock().expect("log buffer poisoned"),
                }
            }
        }

        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "shift_width = 2\n").unwrap();
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = BufferWriter {
            inner: buffer.clone(),
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            load_from(Some(tmp.path().to_path_buf())).unwrap();
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("config_loaded"));
    }

    #[test]
    fn indent_unit_respects_expand_tab() {
        let spaces = EngineConfig {
            shift_width: 2,
            expand_tab: true,
            auto_indent: true,
        };
        assert_eq!(spaces.indent_unit(), "  ");
        let tabs = EngineConfig {
            expand_tab: false,
            ..EngineConfig::default()
        };
        assert_eq!(tabs.indent_unit(), "\t");
    }
}
