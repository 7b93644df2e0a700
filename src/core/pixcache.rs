use crate::style::Color;
use crate::style::Texture;
use crate::style::TextureKind;

use winsys::geometry::Dim;
use winsys::window::Pixmap;

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PixmapKey {
    pub dim: Dim,
    pub kind: TextureKind,
    pub colors: (Color, Color),
}

impl PixmapKey {
    pub fn new(
        dim: Dim,
        texture: &Texture,
    ) -> Self {
        Self {
            dim,
            kind: texture.kind,
            colors: (texture.color, texture.color_to),
        }
    }
}

#[derive(Debug)]
struct Entry {
    pixmap: Pixmap,
    refs: usize,
    last_used: u64,
}

/// Rendered textures shared between decorations. Entries without
/// outstanding references are evicted least recently used first once the
/// cache grows beyond its capacity.
#[derive(Debug)]
pub struct PixmapCache {
    entries: HashMap<PixmapKey, Entry>,
    capacity: usize,
    clock: u64,
}

impl PixmapCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(256)),
            capacity,
            clock: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up a rendered texture, taking a reference on it.
    pub fn acquire(
        &mut self,
        key: &PixmapKey,
    ) -> Option<Pixmap> {
        let now = self.tick();

        self.entries.get_mut(key).map(|entry| {
            entry.refs += 1;
            entry.last_used = now;
            entry.pixmap
        })
    }

    /// Adds a freshly rendered texture with one reference taken; returns
    /// the pixmaps evicted to make room, which the caller must free.
    pub fn insert(
        &mut self,
        key: PixmapKey,
        pixmap: Pixmap,
    ) -> Vec<Pixmap> {
        let now = self.tick();

        let mut evicted: Vec<Pixmap> = self
            .entries
            .insert(key, Entry {
                pixmap,
                refs: 1,
                last_used: now,
            })
            .map(|replaced| replaced.pixmap)
            .into_iter()
            .collect();

        evicted.extend(self.evict());
        evicted
    }

    /// Returns a reference taken by `acquire` or `insert`.
    pub fn release(
        &mut self,
        pixmap: Pixmap,
    ) -> Vec<Pixmap> {
        if let Some(entry) = self
            .entries
            .values_mut()
            .find(|entry| entry.pixmap == pixmap)
        {
            entry.refs = entry.refs.saturating_sub(1);
        }

        self.evict()
    }

    fn evict(&mut self) -> Vec<Pixmap> {
        let mut evicted = Vec::new();

        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.refs == 0)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(&key, _)| key);

            match victim.and_then(|key| self.entries.remove(&key)) {
                Some(entry) => evicted.push(entry.pixmap),
                None => break,
            }
        }

        evicted
    }

    /// Empties the cache, handing back every pixmap for freeing.
    pub fn drain(&mut self) -> Vec<Pixmap> {
        self.entries.drain().map(|(_, entry)| entry.pixmap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(w: i32) -> PixmapKey {
        PixmapKey::new(Dim::new(w, 18), &Texture::default())
    }

    #[test]
    fn shared_textures_are_reference_counted() {
        let mut cache = PixmapCache::new(1);

        assert!(cache.acquire(&key(10)).is_none());
        assert!(cache.insert(key(10), 100).is_empty());
        assert_eq!(cache.acquire(&key(10)), Some(100));

        // both entries are referenced, so nothing can go
        assert!(cache.insert(key(20), 200).is_empty());
        assert_eq!(cache.len(), 2);

        assert!(cache.release(100).is_empty());
        assert_eq!(cache.release(100), vec![100]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn least_recently_used_goes_first() {
        let mut cache = PixmapCache::new(2);

        cache.insert(key(1), 1);
        cache.insert(key(2), 2);
        cache.release(1);
        cache.release(2);

        cache.acquire(&key(1));
        cache.release(1);

        assert_eq!(cache.insert(key(3), 3), vec![2]);
        assert_eq!(cache.drain().len(), 2);
    }
}
