use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::fetch::Texture;
use crate::request::ContentId;

pub const DEFAULT_HIGH_WATER: usize = 50;

#[derive(Debug, Clone)]
struct CacheEntry {
    texture: Arc<Texture>,
    inserted_seq: u64,
}

/// Decoded textures keyed by content id, shared by every cell showing that id.
///
/// Eviction is by insertion order (an approximation of LRU that needs no
/// bookkeeping on reads). Entries outlive the cells that produced them; the
/// cache, not the cell, decides when a texture goes away.
///
/// Notes on determinism:
/// - Entries are keyed in a `BTreeMap` and insertion order is a monotonic
///   sequence number, so eviction picks are reproducible.
#[derive(Debug)]
pub struct TextureCache {
    high_water: usize,
    next_seq: u64,
    entries: BTreeMap<ContentId, CacheEntry>,
    by_age: BTreeMap<u64, ContentId>,
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER)
    }
}

impl TextureCache {
    pub fn new(high_water: usize) -> Self {
        Self {
            high_water,
            next_seq: 0,
            entries: BTreeMap::new(),
            by_age: BTreeMap::new(),
        }
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_over_high_water(&self) -> bool {
        self.len() > self.high_water
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &ContentId) -> Option<Arc<Texture>> {
        self.entries.get(id).map(|e| e.texture.clone())
    }

    /// Stores `texture` under `id` and returns the cached handle.
    ///
    /// The first successful store wins: storing an id that is already present
    /// keeps (and returns) the existing texture.
    pub fn store(&mut self, id: ContentId, texture: Texture) -> Arc<Texture> {
        if let Some(existing) = self.entries.get(&id) {
            return existing.texture.clone();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let texture = Arc::new(texture);
        self.by_age.insert(seq, id.clone());
        self.entries.insert(
            id,
            CacheEntry {
                texture: texture.clone(),
                inserted_seq: seq,
            },
        );
        texture
    }

    pub fn remove(&mut self, id: &ContentId) -> Option<Arc<Texture>> {
        let entry = self.entries.remove(id)?;
        self.by_age.remove(&entry.inserted_seq);
        Some(entry.texture)
    }

    /// Removes up to `count` of the oldest entries not in `protected`.
    ///
    /// Dropping the cache's `Arc` releases the pixels unless a cell still
    /// holds the same texture.
    pub fn evict(&mut self, count: usize, protected: &BTreeSet<ContentId>) -> Vec<ContentId> {
        let victims: Vec<ContentId> = self
            .by_age
            .values()
            .filter(|id| !protected.contains(*id))
            .take(count)
            .cloned()
            .collect();

        for id in &victims {
            self.remove(id);
        }
        victims
    }

    /// When above the high-water mark, evicts the oldest third of entries
    /// (skipping `protected`). Does nothing otherwise.
    pub fn evict_overflow(&mut self, protected: &BTreeSet<ContentId>) -> Vec<ContentId> {
        if !self.is_over_high_water() {
            return Vec::new();
        }
        let count = self.len() / 3;
        let evicted = self.evict(count, protected);
        debug!(
            evicted = evicted.len(),
            protected = protected.len(),
            remaining = self.len(),
            "texture cache evicted"
        );
        evicted
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::TextureCache;
    use crate::fetch::Texture;
    use crate::request::ContentId;

    fn tex(tag: u8) -> Texture {
        Texture {
            width: 1,
            height: 1,
            rgba: Arc::from(vec![tag, tag, tag, 255]),
        }
    }

    fn id(n: usize) -> ContentId {
        ContentId::new(format!("c{n}"))
    }

    #[test]
    fn first_store_wins() {
        let mut cache = TextureCache::new(10);
        let a = cache.store(id(1), tex(1));
        let b = cache.store(id(1), tex(2));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.get(&id(1)).unwrap().rgba[0], 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_in_insertion_order() {
        let mut cache = TextureCache::new(10);
        for n in 0..5 {
            cache.store(id(n), tex(n as u8));
        }
        // Reads do not refresh age.
        cache.get(&id(0));

        let evicted = cache.evict(2, &BTreeSet::new());
        assert_eq!(evicted, vec![id(0), id(1)]);
        assert!(!cache.contains(&id(0)));
        assert!(cache.contains(&id(2)));
    }

    #[test]
    fn below_high_water_nothing_is_evicted() {
        let mut cache = TextureCache::new(50);
        for n in 0..50 {
            cache.store(id(n), tex(0));
        }
        assert!(cache.evict_overflow(&BTreeSet::new()).is_empty());
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn overflow_evicts_oldest_third_but_not_protected() {
        let mut cache = TextureCache::new(50);
        for n in 0..60 {
            cache.store(id(n), tex(0));
        }
        let protected: BTreeSet<_> = [id(0), id(3)].into_iter().collect();

        let evicted = cache.evict_overflow(&protected);
        assert_eq!(evicted.len(), 20);
        assert!(!evicted.contains(&id(0)));
        assert!(!evicted.contains(&id(3)));
        assert!(cache.contains(&id(0)));
        assert!(cache.contains(&id(3)));
        assert!(!cache.contains(&id(1)));
        assert!(cache.contains(&id(22)));
        assert_eq!(cache.len(), 40);
    }

    #[test]
    fn evicted_texture_survives_while_a_cell_holds_it() {
        let mut cache = TextureCache::new(0);
        let held = cache.store(id(1), tex(9));
        cache.evict(1, &BTreeSet::new());
        assert!(cache.is_empty());
        assert_eq!(held.rgba[0], 9);
    }
}
