//! Release artifacts: where they live and how they are fetched

use crate::config::settings::RESOLVER_ARTIFACT;
use crate::error::{BootError, BootResult};
use crate::ui::{DownloadProgress, UiContext};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Release hosting location; `<host>/<tag>/<asset>`
pub const RELEASE_HOST: &str = "https://github.com/boot-clj/boot/releases/download";

const TAG_RELEASE: &str = include_str!("tag-release.toml");

#[derive(Debug, Default, Deserialize)]
struct TagTable {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// File name of the per-version entry point inside a version directory
pub fn launch_artifact() -> String {
    format!("boot-app{}", std::env::consts::EXE_SUFFIX)
}

/// Release asset holding the entry point for this platform
pub fn platform_asset() -> String {
    format!(
        "boot-app-{}-{}{}",
        std::env::consts::ARCH,
        std::env::consts::OS,
        std::env::consts::EXE_SUFFIX
    )
}

/// Release tag a version was published under; also its directory name
pub fn release_tag(version: &str) -> String {
    let table: TagTable = toml::from_str(TAG_RELEASE).unwrap_or_else(|e| {
        warn!("Ignoring malformed release alias table: {}", e);
        TagTable::default()
    });
    table
        .aliases
        .get(version)
        .cloned()
        .unwrap_or_else(|| version.to_string())
}

/// Whether a version directory holds every artifact a run needs
pub fn is_complete(dir: &Path) -> bool {
    dir.join(launch_artifact()).is_file() && dir.join(RESOLVER_ARTIFACT).is_file()
}

pub fn download_url(tag: &str, asset: &str) -> String {
    format!("{}/{}/{}", RELEASE_HOST, tag, asset)
}

/// Fetch `url` into `target` unless `target` already exists
///
/// The body is streamed into `<target>.part` and renamed on success, so an
/// interrupted download never leaves a truncated artifact behind.
pub fn download(ui: &UiContext, url: &str, target: &Path) -> BootResult<PathBuf> {
    if target.exists() {
        debug!("Already downloaded: {}", target.display());
        return Ok(target.to_path_buf());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BootError::io(format!("creating {}", parent.display()), e))?;
    }

    info!("Downloading {}", url);
    let failed = |reason: String| BootError::Download {
        url: url.to_string(),
        reason,
    };

    let mut response = ureq::get(url).call().map_err(|e| failed(e.to_string()))?;
    let total = response
        .headers()
        .get(ureq::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut part_name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    part_name.push(".part");
    let part = target.with_file_name(part_name);

    let progress = DownloadProgress::new(ui, url, total);
    let copied = {
        let reader = response.body_mut().as_reader();
        let mut file = File::create(&part)
            .map_err(|e| BootError::io(format!("creating {}", part.display()), e))?;
        progress
            .copy(reader, &mut file)
            .and_then(|_| file.sync_all())
    };
    progress.finish();

    if let Err(e) = copied {
        let _ = fs::remove_file(&part);
        return Err(failed(e.to_string()));
    }

    make_executable(&part)?;
    fs::rename(&part, target)
        .map_err(|e| BootError::io(format!("installing {}", target.display()), e))?;
    info!("Downloaded {}", target.display());
    Ok(target.to_path_buf())
}

/// Download the entry point and resolver artifact of `version` into `bin_dir`
///
/// Artifacts already present are kept, so this also repairs a version
/// directory left incomplete by an interrupted install. Returns the directory
/// name the version was installed under.
pub fn install(ui: &UiContext, bin_dir: &Path, version: &str) -> BootResult<String> {
    let tag = release_tag(version);
    let dir = bin_dir.join(&tag);

    for (asset, file) in [
        (platform_asset(), launch_artifact()),
        (RESOLVER_ARTIFACT.to_string(), RESOLVER_ARTIFACT.to_string()),
    ] {
        download(ui, &download_url(&tag, &asset), &dir.join(file)).map_err(|e| match e {
            BootError::Download { reason, .. } if reason.contains("404") => {
                BootError::ReleaseNotFound(version.to_string())
            }
            other => other,
        })?;
    }
    Ok(tag)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> BootResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| BootError::io(format!("setting permissions on {}", path.display()), e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> BootResult<()> {
    Ok(())
}
