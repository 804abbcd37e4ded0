//! Disk-backed named caches.
//!
//! Layout: `<root>/<cache name>/<sha256(url)>.json` holding the URL, status
//! and content type, next to `<sha256(url)>.body` holding the raw bytes.
//! Creation order is recorded in `<root>/caches.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CacheError;

use super::{CacheStorage, Response};

const INDEX_FILE: &str = "caches.json";

#[derive(Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    content_type: Option<String>,
}

pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(DiskCacheStorage { root })
    }

    /// Caches under the platform cache directory.
    pub fn in_cache_dir() -> Result<Self, CacheError> {
        let dirs = directories::ProjectDirs::from("net", "gong", "gong").ok_or_else(|| {
            CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no home directory",
            ))
        })?;
        DiskCacheStorage::new(dirs.cache_dir().join("offline"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, cache: &str) -> Result<PathBuf, CacheError> {
        let valid = !cache.is_empty()
            && cache != "."
            && cache != ".."
            && cache
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CacheError::InvalidName {
                name: cache.to_string(),
            });
        }
        Ok(self.root.join(cache))
    }

    fn read_index(&self) -> Result<Vec<String>, CacheError> {
        let path = self.root.join(INDEX_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| CacheError::Corrupt {
                url: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_index(&self, names: &[String]) -> Result<(), CacheError> {
        let text = serde_json::to_string(names).map_err(|e| CacheError::Corrupt {
            url: INDEX_FILE.to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(&self.root.join(INDEX_FILE), text.as_bytes())
    }
}

fn entry_stem(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl CacheStorage for DiskCacheStorage {
    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.read_index()
    }

    fn open(&mut self, cache: &str) -> Result<(), CacheError> {
        let dir = self.cache_dir(cache)?;
        fs::create_dir_all(&dir)?;
        let mut names = self.read_index()?;
        if !names.iter().any(|n| n == cache) {
            names.push(cache.to_string());
            self.write_index(&names)?;
        }
        Ok(())
    }

    fn put(&mut self, cache: &str, url: &str, response: &Response) -> Result<(), CacheError> {
        self.open(cache)?;
        let dir = self.cache_dir(cache)?;
        let stem = entry_stem(url);
        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        let meta = serde_json::to_vec(&meta).map_err(|e| CacheError::Corrupt {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        // Body first: an entry exists once its metadata does.
        write_atomic(&dir.join(format!("{stem}.body")), &response.body)?;
        write_atomic(&dir.join(format!("{stem}.json")), &meta)
    }

    fn match_in(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError> {
        let dir = self.cache_dir(cache)?;
        let stem = entry_stem(url);
        let meta = match fs::read(dir.join(format!("{stem}.json"))) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta).map_err(|e| CacheError::Corrupt {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if meta.url != url {
            return Ok(None);
        }
        let body = fs::read(dir.join(format!("{stem}.body")))?;
        Ok(Some(Response {
            status: meta.status,
            content_type: meta.content_type,
            body,
        }))
    }

    fn delete(&mut self, cache: &str) -> Result<bool, CacheError> {
        let dir = self.cache_dir(cache)?;
        let mut names = self.read_index()?;
        let existed = names.iter().any(|n| n == cache);
        names.retain(|n| n != cache);
        self.write_index(&names)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(existed)
    }
}
