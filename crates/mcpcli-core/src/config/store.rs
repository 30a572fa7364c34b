//! Config store for loading and saving config.json.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::paths::ConfigPaths;
use super::schema::Configuration;

/// Owner of the on-disk configuration file.
///
/// Holds no configuration in memory: every `load` reads the file again.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: ConfigPaths,
}

impl ConfigStore {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> &Path {
        &self.paths.config_file
    }

    pub fn legacy_path(&self) -> Option<&Path> {
        self.paths.legacy_file.as_deref()
    }

    pub fn load(&self) -> Result<Configuration> {
        self.ensure_initialized()?;
        read_configuration(&self.paths.config_file)
    }

    pub fn save(&self, config: &Configuration) -> Result<()> {
        write_configuration(&self.paths.config_file, config)
    }

    /// Make sure the canonical file exists, migrating the legacy file or
    /// writing an empty configuration.
    fn ensure_initialized(&self) -> Result<()> {
        let config_file = &self.paths.config_file;
        if let Some(parent) = non_empty_parent(config_file) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        if config_file.exists() {
            return Ok(());
        }

        if let Some(legacy) = self.legacy_path().filter(|p| p.exists()) {
            match read_configuration(legacy).and_then(|c| write_configuration(config_file, &c)) {
                Ok(()) => {
                    info!(
                        from = %legacy.display(),
                        to = %config_file.display(),
                        "Migrated legacy configuration"
                    );
                    return Ok(());
                }
                Err(err) => {
                    warn!(from = %legacy.display(), error = %err, "Failed to migrate legacy configuration");
                }
            }
        }

        debug!(path = %config_file.display(), "Creating empty configuration");
        write_configuration(config_file, &Configuration::new())
    }
}

/// Parse a configuration file at an arbitrary path.
pub fn read_configuration(path: &Path) -> Result<Configuration> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::io(path, e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| Error::MalformedConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serialize a configuration and atomically replace the file at `path`.
///
/// Output is pretty-printed with a trailing newline, so writing the same
/// configuration twice yields identical bytes.
pub fn write_configuration(path: &Path, config: &Configuration) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(config)
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?;
    bytes.push(b'\n');

    let parent = non_empty_parent(path).unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    tmp.write_all(&bytes).map_err(|e| Error::io(tmp.path().to_path_buf(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io(tmp.path().to_path_buf(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    debug!(path = %path.display(), servers = config.servers.len(), "Wrote configuration");
    Ok(())
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
