// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for step tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        Some(parent) if parent != path => Some(parent),
        _ => None,
    }
}

fn child_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        files.insert(path.clone(), MockEntry::File(content.into()));
        Self::link_to_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.lock();
        Self::ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Contents of a file as UTF-8, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.lock().get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        }
    }

    fn link_to_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if let Some(parent) = parent_of(path) {
            Self::ensure_dir_entry(files, parent);
            if let (Some(MockEntry::Dir(children)), Some(name)) =
                (files.get_mut(parent), child_name(path))
            {
                if !children.contains(&name) {
                    children.push(name);
                }
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_to_parent(files, path);
        }
    }

    fn remove_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if let Some(MockEntry::Dir(children)) = files.remove(path) {
            for child in children {
                Self::remove_entry(files, &path.join(child));
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                let mut entries: Vec<PathBuf> =
                    children.iter().map(|name| path.join(name)).collect();
                entries.sort();
                Ok(entries)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.is_file(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        self.add_dir(path);
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let mut files = self.lock();
        Self::remove_entry(&mut files, path);
        if let (Some(parent), Some(name)) = (parent_of(path), child_name(path)) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|c| *c != name);
            }
        }
        Ok(())
    }
}
