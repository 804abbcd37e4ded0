//! In-memory named caches.

use std::collections::HashMap;

use crate::error::CacheError;

use super::{CacheStorage, Response};

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    /// Caches in creation order.
    caches: Vec<(String, HashMap<String, Response>)>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, cache: &str) -> Option<&HashMap<String, Response>> {
        self.caches.iter().find(|(n, _)| n == cache).map(|(_, c)| c)
    }

    /// Number of entries in `cache`, or 0 if it does not exist.
    pub fn len(&self, cache: &str) -> usize {
        self.find(cache).map_or(0, HashMap::len)
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.iter().map(|(n, _)| n.clone()).collect())
    }

    fn open(&mut self, cache: &str) -> Result<(), CacheError> {
        if self.find(cache).is_none() {
            self.caches.push((cache.to_string(), HashMap::new()));
        }
        Ok(())
    }

    fn put(&mut self, cache: &str, url: &str, response: &Response) -> Result<(), CacheError> {
        self.open(cache)?;
        if let Some((_, entries)) = self.caches.iter_mut().find(|(n, _)| n == cache) {
            entries.insert(url.to_string(), response.clone());
        }
        Ok(())
    }

    fn match_in(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError> {
        Ok(self.find(cache).and_then(|c| c.get(url)).cloned())
    }

    fn delete(&mut self, cache: &str) -> Result<bool, CacheError> {
        let before = self.caches.len();
        self.caches.retain(|(n, _)| n != cache);
        Ok(self.caches.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_match() {
        let mut s = MemoryCacheStorage::new();
        s.put("a", "/x", &Response::ok("text/plain", "x")).unwrap();
        assert_eq!(s.match_in("a", "/x").unwrap().unwrap().body, b"x");
        assert!(s.match_in("a", "/y").unwrap().is_none());
        assert!(s.match_in("b", "/x").unwrap().is_none());
        assert_eq!(s.len("a"), 1);
    }

    #[test]
    fn match_any_prefers_oldest_cache() {
        let mut s = MemoryCacheStorage::new();
        s.put("old", "/x", &Response::ok("text/plain", "old")).unwrap();
        s.put("new", "/x", &Response::ok("text/plain", "new")).unwrap();
        assert_eq!(s.match_any("/x").unwrap().unwrap().body, b"old");
    }

    #[test]
    fn delete_reports_existence() {
        let mut s = MemoryCacheStorage::new();
        s.open("a").unwrap();
        assert!(s.delete("a").unwrap());
        assert!(!s.delete("a").unwrap());
        assert!(s.keys().unwrap().is_empty());
    }
}
