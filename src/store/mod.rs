//! File-backed JSON tables
//!
//! Each table is a single JSON array of typed records, read fully into memory
//! on open. Mutations are buffered; `commit()` writes the file atomically
//! (temp file + rename). `Drop` performs a best-effort flush so an early
//! return with `?` still persists buffered writes.
//!
//! One operation opens, mutates, and commits its tables before returning;
//! there is no cross-call handle sharing. Concurrent processes mutating the
//! same file can lose updates; the target usage is a single interactive
//! agent, so this is a documented limitation rather than a guarded case.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::Result;

pub struct JsonTable<T: Serialize + DeserializeOwned> {
    path: PathBuf,
    records: Vec<T>,
    dirty: bool,
}

impl<T: Serialize + DeserializeOwned> JsonTable<T> {
    /// Open a table, creating parent directories. A missing or empty file is
    /// an empty table, not an error.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let records = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
            dirty: false,
        })
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, record: T) {
        self.records.push(record);
        self.dirty = true;
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.records.iter().find(|r| pred(r))
    }

    /// Apply `apply` to every record matching `pred`; returns the match count.
    pub fn update_where(
        &mut self,
        pred: impl Fn(&T) -> bool,
        mut apply: impl FnMut(&mut T),
    ) -> usize {
        let mut updated = 0;
        for record in self.records.iter_mut().filter(|r| pred(r)) {
            apply(record);
            updated += 1;
        }
        if updated > 0 {
            self.dirty = true;
        }
        updated
    }

    /// Remove matching records and return them.
    pub fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.records.len() {
            if pred(&self.records[i]) {
                removed.push(self.records.remove(i));
            } else {
                i += 1;
            }
        }
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed
    }

    /// Flush buffered writes to disk. Writes to a temp file in the same
    /// directory, then renames over the target so a crash never leaves a
    /// half-written table.
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        self.dirty = false;

        tracing::debug!(path = %self.path.display(), count = self.records.len(), "table flushed");
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> Drop for JsonTable<T> {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.commit() {
                tracing::warn!(path = %self.path.display(), "flush on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        count: u64,
    }

    fn row(name: &str, count: u64) -> Row {
        Row {
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table: JsonTable<Row> = JsonTable::open(&dir.path().join("rows.json")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_commit_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");

        let mut table: JsonTable<Row> = JsonTable::open(&path).unwrap();
        table.insert(row("alpha", 1));
        table.insert(row("beta", 2));
        table.commit().unwrap();

        let reopened: JsonTable<Row> = JsonTable::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records()[0], row("alpha", 1));
    }

    #[test]
    fn test_update_where() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");

        let mut table: JsonTable<Row> = JsonTable::open(&path).unwrap();
        table.insert(row("alpha", 1));
        let updated = table.update_where(|r| r.name == "alpha", |r| r.count += 1);
        assert_eq!(updated, 1);
        assert_eq!(table.records()[0].count, 2);

        let updated = table.update_where(|r| r.name == "missing", |r| r.count += 1);
        assert_eq!(updated, 0);
    }

    #[test]
    fn test_remove_where() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");

        let mut table: JsonTable<Row> = JsonTable::open(&path).unwrap();
        table.insert(row("alpha", 1));
        table.insert(row("beta", 2));

        let removed = table.remove_where(|r| r.name == "alpha");
        assert_eq!(removed.len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_flush_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");

        {
            let mut table: JsonTable<Row> = JsonTable::open(&path).unwrap();
            table.insert(row("alpha", 1));
            // no explicit commit
        }

        let reopened: JsonTable<Row> = JsonTable::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }
}
