// Config file read/replace with a content digest guard and atomic rename.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::error::{Error, ErrorKind};

/// Text of a config file as read, plus the digest used to detect concurrent edits.
#[derive(Clone, Debug)]
pub struct ConfigSource {
    path: PathBuf,
    text: String,
    digest: [u8; 32],
}

impl ConfigSource {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let bytes = fs::read(&resolved).map_err(|err| {
            Error::from_io(err, path).with_message("failed to read config file")
        })?;
        let digest = digest(&bytes);
        let text = String::from_utf8(bytes).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("config file is not valid UTF-8")
                .with_path(path)
                .with_source(err)
        })?;
        Ok(Self {
            path: resolved,
            text,
            digest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Replace the file with `contents` unless it changed since it was read.
    pub fn replace(&self, contents: &str) -> Result<(), Error> {
        let current = fs::read(&self.path).map_err(|err| {
            Error::from_io(err, &self.path).with_message("failed to re-read config file")
        })?;
        if digest(&current) != self.digest {
            return Err(Error::new(ErrorKind::Conflict)
                .with_message("config file changed while it was being edited")
                .with_path(&self.path)
                .with_hint("Re-run the command; another writer modified the file."));
        }

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_err = |err: std::io::Error| {
            Error::from_io(err, &self.path).with_message("failed to write config file")
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".wpconf-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(io_err)?;
        staged.write_all(contents.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        let permissions = fs::metadata(&self.path).map_err(io_err)?.permissions();
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(io_err)?;
        staged.persist(&self.path).map_err(|err| io_err(err.error))?;
        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "config file replaced");
        Ok(())
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}
