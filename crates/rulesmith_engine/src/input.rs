//! Enumeration of source rule files into an ordered batch.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use rulesmith_core::RuleItem;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("rules directory not found: {0}")]
    MissingDir(String),
    #[error("failed to read rule file {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Read every rule file in `dir` into an ordered batch.
///
/// Files are sorted by name so the batch (and therefore the final summary)
/// is deterministic for a given directory. Hidden files, non-files, and
/// anything inside `exclude` (the output dir) are skipped. Content is read
/// eagerly; an unreadable file aborts enumeration since it is a local
/// configuration problem, not a remote one.
pub fn enumerate_rule_files(dir: &Path, exclude: Option<&Path>) -> Result<Vec<RuleItem>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::MissingDir(dir.display().to_string()));
    }

    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .filter(|entry| exclude.is_none_or(|ex| entry.path().as_path() != ex))
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let content = fs::read_to_string(entry.path()).map_err(|source| InputError::Unreadable {
            name: name.clone(),
            source,
        })?;
        let mut item = RuleItem::new(name.clone(), content);
        if let Some(ext) = Path::new(&name).extension().and_then(|e| e.to_str()) {
            item = item.with_format(ext);
        }
        items.push(item);
    }
    Ok(items)
}
