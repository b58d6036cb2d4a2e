use std::{
    fs::File,
    path::{Path, PathBuf},
};

use libhashplay_core::{Error, Result};
use tracing::debug;

/// A file handle opened on first use and dropped by [`LazyFile::close`], by
/// `Drop`, or by whoever takes it. There is no other way to release it.
#[derive(Debug)]
pub(crate) struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn get(&mut self) -> Result<&mut File> {
        let f = match self.file.take() {
            Some(f) => f,
            None => {
                debug!(path = ?self.path, "opening");
                File::open(&self.path).map_err(|source| Error::Open {
                    path: self.path.clone(),
                    source,
                })?
            }
        };
        Ok(self.file.insert(f))
    }

    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = ?self.path, "closed");
        }
    }
}
