use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

pub const REPORT_FILENAME: &str = "report.txt";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Persists one artifact per rule identifier plus the final run report.
///
/// Writes go through a temp file and a rename, so a re-run replaces prior
/// outputs in place and a crash never leaves a partial artifact behind.
/// Safe for concurrent use: each write owns its temp file.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one named artifact, replacing any previous file of that name.
    pub fn write_artifact(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_atomic(filename, content)
    }

    /// Write the final text report for the run.
    pub fn write_report(&self, content: &str) -> Result<PathBuf, PersistError> {
        self.write_atomic(REPORT_FILENAME, content)
    }

    fn write_atomic(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present to keep determinism.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
