//! Storage media the event store writes records to.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use regex::Regex;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Record-level storage: create, list by pattern, read.
///
/// Each record is created once and never modified, so a medium only has to
/// make a single create atomic.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Creates `path` holding `contents`. Fails if `path` already exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` on I/O failure or name collision.
    async fn create_for_writing(&self, path: &Path, contents: &str) -> Result<(), DomainError>;

    /// Paths of the records directly inside `directory` whose file name
    /// matches the glob `pattern`, sorted by path. A missing directory
    /// yields no paths.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` on I/O failure or an invalid pattern.
    async fn list(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, DomainError>;

    /// Reads the whole record at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the record is missing or unreadable.
    async fn open_for_reading(&self, path: &Path) -> Result<String, DomainError>;
}

/// Compiles a file-name glob into an anchored regex. `*` matches any run of
/// characters other than path separators, `?` exactly one such character.
fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let mut source = String::with_capacity(pattern.len() * 2 + 2);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(r"[^/\\]*"),
            '?' => source.push_str(r"[^/\\]"),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source)
        .map_err(|e| DomainError::Storage(format!("invalid listing pattern {pattern:?}: {e}")))
}

fn file_name_matches(path: &Path, matcher: &Regex) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| matcher.is_match(name))
}

fn io_error(action: &str, path: &Path, e: &std::io::Error) -> DomainError {
    DomainError::Storage(format!("failed to {action} {}: {e}", path.display()))
}

/// Medium backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemMedium;

impl FileSystemMedium {
    /// Creates a file-system medium.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageMedium for FileSystemMedium {
    async fn create_for_writing(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory", parent, &e))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| io_error("create record", path, &e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| io_error("write record", path, &e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync record", path, &e))?;
        Ok(())
    }

    async fn list(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, DomainError> {
        let matcher = glob_to_regex(pattern)?;
        let mut dir = match fs::read_dir(directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read directory", directory, &e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("read directory entry in", directory, &e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error("inspect", &entry.path(), &e))?
                .is_file();
            let path = entry.path();
            if is_file && file_name_matches(&path, &matcher) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn open_for_reading(&self, path: &Path) -> Result<String, DomainError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| io_error("read record", path, &e))
    }
}

/// Medium that keeps records in memory. Intended for tests and tooling.
#[derive(Debug, Default)]
pub struct InMemoryMedium {
    records: Mutex<BTreeMap<PathBuf, String>>,
}

impl InMemoryMedium {
    /// Creates an empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All stored paths in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    /// Contents of every stored record in path order.
    #[must_use]
    pub fn contents(&self) -> Vec<String> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageMedium for InMemoryMedium {
    async fn create_for_writing(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
        let mut records = self.lock();
        if records.contains_key(path) {
            return Err(DomainError::Storage(format!(
                "record {} already exists",
                path.display()
            )));
        }
        records.insert(path.to_path_buf(), contents.to_owned());
        Ok(())
    }

    async fn list(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, DomainError> {
        let matcher = glob_to_regex(pattern)?;
        Ok(self
            .lock()
            .keys()
            .filter(|path| path.parent() == Some(directory))
            .filter(|path| file_name_matches(path, &matcher))
            .cloned()
            .collect())
    }

    async fn open_for_reading(&self, path: &Path) -> Result<String, DomainError> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| DomainError::Storage(format!("record {} not found", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_matches_within_one_name() {
        let matcher = glob_to_regex("*#abc#*.event").unwrap();

        assert!(matcher.is_match("0000000000000064#abc#0.event"));
        assert!(!matcher.is_match("0000000000000064#abcd#0.event"));
        assert!(!matcher.is_match("0000000000000064#abc#0.events"));
        assert!(!matcher.is_match("dir/0000000000000064#abc#0.event"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let matcher = glob_to_regex("a.b+?").unwrap();

        assert!(matcher.is_match("a.b+c"));
        assert!(!matcher.is_match("axb+c"));
    }

    #[tokio::test]
    async fn test_in_memory_create_rejects_existing_path() {
        let medium = InMemoryMedium::new();
        let path = Path::new("/store/a#b#0.event");

        medium.create_for_writing(path, "one").await.unwrap();
        let result = medium.create_for_writing(path, "two").await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert_eq!(medium.open_for_reading(path).await.unwrap(), "one");
    }

    #[tokio::test]
    async fn test_in_memory_list_is_limited_to_directory() {
        let medium = InMemoryMedium::new();
        medium
            .create_for_writing(Path::new("/store/1#a#0.event"), "")
            .await
            .unwrap();
        medium
            .create_for_writing(Path::new("/other/2#a#0.event"), "")
            .await
            .unwrap();
        medium
            .create_for_writing(Path::new("/store/nested/3#a#0.event"), "")
            .await
            .unwrap();

        let paths = medium.list(Path::new("/store"), "*#*#*.event").await.unwrap();

        assert_eq!(paths, vec![PathBuf::from("/store/1#a#0.event")]);
    }

    #[tokio::test]
    async fn test_in_memory_read_missing_record_fails() {
        let medium = InMemoryMedium::new();

        let result = medium.open_for_reading(Path::new("/store/missing")).await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
    }
}
