//! Purpose: Implement `wpconf create` to write a fresh config file from the template.
//! Exports: `CreateConfig`, `CreateResult`, `create`.
//! Role: Bootstrap path for new sites; the template itself lives in the library.
//! Invariants: Never overwrites an existing file unless `force` is set.
//! Invariants: Parameters are validated before anything touches the filesystem.
use std::path::{Path, PathBuf};

use wpconf::api::{Error, ErrorKind, TemplateParams, render_template};

#[derive(Debug)]
pub struct CreateConfig {
    pub path: PathBuf,
    pub params: TemplateParams,
    pub force: bool,
}

#[derive(Debug)]
pub struct CreateResult {
    pub path: String,
    pub salts: usize,
    pub overwrote_existing: bool,
}

pub fn create(config: CreateConfig) -> Result<CreateResult, Error> {
    config.params.validate()?;
    let path = absolutize(&config.path)?;
    let existed = path.exists();
    if existed && !config.force {
        return Err(Error::new(ErrorKind::AlreadyExists)
            .with_message("config file already exists")
            .with_path(&path)
            .with_hint("Re-run with --force to overwrite or choose a different --config path."));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            Error::from_io(err, parent).with_message("failed to create config directory")
        })?;
    }

    std::fs::write(&path, render_template(&config.params))
        .map_err(|err| Error::from_io(err, &path).with_message("failed to write config file"))?;
    tracing::debug!(path = %path.display(), "wrote new config file");

    Ok(CreateResult {
        path: path.display().to_string(),
        salts: config.params.salts.len(),
        overwrote_existing: existed,
    })
}

fn absolutize(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read current directory")
            .with_source(err)
    })?;
    Ok(cwd.join(path))
}
