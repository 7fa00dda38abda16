//! Installation properties file
//!
//! Pins the tool and runtime versions for later invocations. Written with
//! `toml_edit` so keys and comments a user added by hand survive updates.

use super::{keys, Settings};
use crate::cache::lock::LockedFile;
use crate::error::{BootError, BootResult};
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{value, DocumentMut};
use tracing::{debug, info};

/// The installation-level `boot.toml`
#[derive(Debug, Clone)]
pub struct Properties {
    path: PathBuf,
}

impl Properties {
    /// Properties file at a specific path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Properties file of the installation described by `settings`
    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(settings.properties_path())
    }

    /// Path of the properties file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the version pins for `settings` without touching disk
    pub fn render(settings: &Settings) -> String {
        let mut doc = DocumentMut::new();
        apply(&mut doc, settings);
        doc.to_string()
    }

    /// Create the file from `settings` unless it already exists
    pub async fn ensure(&self, settings: &Settings) -> BootResult<()> {
        let _lock = LockedFile::acquire_async(&self.path).await?;
        if self.path.exists() {
            return Ok(());
        }
        self.write_locked(settings)?;
        info!("Created {}", self.path.display());
        Ok(())
    }

    /// Overwrite the version pins with `settings`, keeping other content
    pub async fn update(&self, settings: &Settings) -> BootResult<String> {
        let _lock = LockedFile::acquire_async(&self.path).await?;
        let rendered = self.write_locked(settings)?;
        info!("Updated {}", self.path.display());
        Ok(rendered)
    }

    fn write_locked(&self, settings: &Settings) -> BootResult<String> {
        let mut doc = match fs::read_to_string(&self.path) {
            Ok(content) => content.parse::<DocumentMut>()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => {
                return Err(BootError::io(
                    format!("reading properties from {}", self.path.display()),
                    e,
                ))
            }
        };
        apply(&mut doc, settings);
        let rendered = doc.to_string();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BootError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, &rendered)
            .map_err(|e| BootError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| BootError::io(format!("replacing {}", self.path.display()), e))?;

        debug!("Wrote properties to {}", self.path.display());
        Ok(rendered)
    }
}

fn apply(doc: &mut DocumentMut, settings: &Settings) {
    doc[keys::CLOJURE_NAME] = value(settings.clojure_name.as_str());
    doc[keys::CLOJURE_VERSION] = value(settings.clojure_version.as_str());
    doc[keys::VERSION] = value(settings.boot_version.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSnapshot, ConfigSources};
    use tempfile::TempDir;

    fn settings(temp: &TempDir, version: &str) -> Settings {
        let src = ConfigSources {
            work_dir: temp.path().to_path_buf(),
            ..Default::default()
        }
        .with_override(keys::HOME, temp.path().join("home").display().to_string())
        .with_override(keys::VERSION, version);
        let mut snap = ConfigSnapshot::load(&src).unwrap();
        Settings::resolve(&mut snap, "2.8.3").unwrap()
    }

    #[test]
    fn render_lists_version_pins() {
        let temp = TempDir::new().unwrap();
        let rendered = Properties::render(&settings(&temp, "2.8.3"));
        assert!(rendered.contains("BOOT_VERSION = \"2.8.3\""));
        assert!(rendered.contains("BOOT_CLOJURE_NAME = \"org.clojure/clojure\""));
        assert!(rendered.contains("BOOT_CLOJURE_VERSION = \"1.10.1\""));
    }

    #[tokio::test]
    async fn ensure_creates_once() {
        let temp = TempDir::new().unwrap();
        let first = settings(&temp, "2.8.3");
        let props = Properties::for_settings(&first);

        props.ensure(&first).await.unwrap();
        props.ensure(&settings(&temp, "2.7.2")).await.unwrap();

        let content = fs::read_to_string(props.path()).unwrap();
        assert!(content.contains("\"2.8.3\""));
        assert!(!content.contains("\"2.7.2\""));
    }

    #[tokio::test]
    async fn update_preserves_foreign_keys() {
        let temp = TempDir::new().unwrap();
        let s = settings(&temp, "2.8.3");
        let props = Properties::for_settings(&s);
        fs::create_dir_all(props.path().parent().unwrap()).unwrap();
        fs::write(
            props.path(),
            "# local tweaks\nBOOT_LOCAL_REPO = \"/repo\"\nBOOT_VERSION = \"2.0.0\"\n",
        )
        .unwrap();

        props.update(&s).await.unwrap();

        let content = fs::read_to_string(props.path()).unwrap();
        assert!(content.contains("# local tweaks"));
        assert!(content.contains("BOOT_LOCAL_REPO = \"/repo\""));
        assert!(content.contains("BOOT_VERSION = \"2.8.3\""));
        assert!(!content.contains("2.0.0"));
    }
}
