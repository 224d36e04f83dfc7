//! Generated job script
//!
//! The assembled script body is written to a `script-*.sh` file on the
//! host and bind-mounted read-only at `/<file name>` in the container. The
//! file is deleted when the [`ScriptFile`] is dropped, whichever way the
//! run ends.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::JobError;

/// Host-side script file, removed on drop
pub struct ScriptFile {
    file: NamedTempFile,
    container_path: String,
}

impl ScriptFile {
    /// Writes the script body to a new file in `dir`
    pub fn create_in(dir: &Path, body: &str) -> Result<Self, JobError> {
        let mut file = tempfile::Builder::new()
            .prefix("script-")
            .suffix(".sh")
            .tempfile_in(dir)
            .map_err(|e| JobError::io("Failed to create script file", e))?;

        file.write_all(body.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| JobError::io("Failed to write script file", e))?;

        make_executable(file.path())
            .map_err(|e| JobError::io("Failed to make script file executable", e))?;

        let file_name = file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let container_path = format!("/{}", file_name);

        debug!(
            "Wrote script {} for container path {}",
            file.path().display(),
            container_path
        );

        Ok(Self {
            file,
            container_path,
        })
    }

    pub fn host_path(&self) -> &Path {
        self.file.path()
    }

    /// Where the script is mounted inside the container
    pub fn container_path(&self) -> &str {
        &self.container_path
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
