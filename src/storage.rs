//! The persistence gateway: an async-agnostic key/value store of named
//! string blobs. The simulation core never touches I/O directly; the session
//! layer goes through `BlobStore` so hosts can plug in whatever backend the
//! platform offers.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One file per key under a root directory, written atomically via a temp
/// file and rename. Production roots come from the platform's project dirs;
/// tests inject a temp dir.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self> {
        let proj = ProjectDirs::from("com", "pocketgotchi", "Pocketgotchi")
            .context("could not resolve project directories")?;
        Self::with_root(proj.data_local_dir().to_path_buf())
    }

    pub fn with_root(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("could not create save directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("could not read blob `{key}`")),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("could not write blob `{key}`"))?;
        atomic_rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("could not remove blob `{key}`")),
        }
    }
}

/// Best-effort atomic replace on the same filesystem.
fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
        .with_context(|| format!("could not rename {} into place", to.display()))?;
    Ok(())
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    blobs: BTreeMap<String, String>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}
