//! Bounded cache of composited render windows.

use std::collections::{HashMap, VecDeque};

use image::{imageops, Rgba, RgbaImage};
use sidecraft_core::{ContentHash, Tile, MAX_ROW, TILE_PIXELS};
use tracing::{debug, trace};

use crate::TileSerial;

/// Normalized window of cells: columns `c0..c1`, rows `r0..=r1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowKey {
    columns: (i32, i32),
    rows: (i32, i32),
}

impl WindowKey {
    /// Sorts both ranges and clamps the row endpoints into the world.
    #[must_use]
    pub fn normalized(columns: (i32, i32), rows: (i32, i32)) -> Self {
        let columns = (columns.0.min(columns.1), columns.0.max(columns.1));
        let rows = (
            rows.0.min(rows.1).clamp(0, MAX_ROW),
            rows.0.max(rows.1).clamp(0, MAX_ROW),
        );
        Self { columns, rows }
    }

    /// First and one-past-last column.
    #[must_use]
    pub const fn columns(&self) -> (i32, i32) {
        self.columns
    }

    /// First and last row, both inclusive.
    #[must_use]
    pub const fn rows(&self) -> (i32, i32) {
        self.rows
    }

    /// Number of columns covered.
    #[must_use]
    pub const fn width_in_cells(&self) -> u32 {
        self.columns.1.abs_diff(self.columns.0)
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn height_in_cells(&self) -> u32 {
        self.rows.1.abs_diff(self.rows.0) + 1
    }

    /// Size of the composite image in pixels, or `None` when the pixel
    /// count does not fit in a `u32`.
    #[must_use]
    pub const fn pixel_size(&self) -> Option<(u32, u32)> {
        match (
            self.width_in_cells().checked_mul(TILE_PIXELS),
            self.height_in_cells().checked_mul(TILE_PIXELS),
        ) {
            (Some(width), Some(height)) if width.checked_mul(height).is_some() => {
                Some((width, height))
            }
            _ => None,
        }
    }
}

/// Identity of the tile last painted into a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CellRecord {
    pub(crate) serial: TileSerial,
    pub(crate) hash: ContentHash,
}

/// Composite image of a window plus the identity of every painted cell.
#[derive(Debug)]
pub(crate) struct WindowEntry {
    composite: RgbaImage,
    records: Vec<Option<CellRecord>>,
    rows: u32,
}

impl WindowEntry {
    fn new(key: WindowKey, (width, height): (u32, u32)) -> Self {
        let cells = key.width_in_cells() as usize * key.height_in_cells() as usize;
        Self {
            composite: RgbaImage::new(width, height),
            records: vec![None; cells],
            rows: key.height_in_cells(),
        }
    }

    pub(crate) fn composite(&self) -> &RgbaImage {
        &self.composite
    }

    /// Repaints the cell at window-relative `(x, y)` unless it already shows `record`.
    ///
    /// Returns whether the cell was recomposited.
    pub(crate) fn refresh(&mut self, x: u32, y: u32, record: CellRecord, tile: &Tile) -> bool {
        let index = x as usize * self.rows as usize + y as usize;
        let Some(slot) = self.records.get_mut(index) else {
            return false;
        };
        if *slot == Some(record) {
            return false;
        }
        *slot = Some(record);

        let height = self.composite.height();
        let cell_x = x * TILE_PIXELS;
        let cell_y = height - (y + 1) * TILE_PIXELS;
        for py in cell_y..cell_y + TILE_PIXELS {
            for px in cell_x..cell_x + TILE_PIXELS {
                self.composite.put_pixel(px, py, Rgba([0, 0, 0, 0]));
            }
        }

        let appearance = tile.appearance();
        imageops::overlay(
            &mut self.composite,
            &*appearance.image,
            i64::from(cell_x) - i64::from(appearance.draw_offset.x),
            i64::from(cell_y) - i64::from(appearance.draw_offset.y),
        );
        true
    }
}

/// Fixed-capacity map from window keys to composites, evicting the oldest insertion.
#[derive(Debug)]
pub struct WindowCache {
    capacity: usize,
    entries: HashMap<WindowKey, WindowEntry>,
    order: VecDeque<WindowKey>,
}

impl WindowCache {
    /// Creates an empty cache holding at most `capacity` windows (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Maximum number of windows kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of windows currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the cache holds no windows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &WindowKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached keys from oldest to newest insertion.
    pub fn keys(&self) -> impl Iterator<Item = &WindowKey> {
        self.order.iter()
    }

    /// Entry for `key`, created blank at `size` pixels when missing. Lookups
    /// never change eviction order.
    pub(crate) fn entry(&mut self, key: WindowKey, size: (u32, u32)) -> &mut WindowEntry {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                let _ = self.entries.remove(&oldest);
                trace!(?oldest, "evicted render window");
            }
            debug!(?key, "created render window");
            self.order.push_back(key);
        }
        self.entries
            .entry(key)
            .or_insert_with(|| WindowEntry::new(key, size))
    }
}

#[cfg(test)]
mod tests {
    use super::{WindowCache, WindowKey};

    #[test]
    fn keys_sort_and_clamp_their_ranges() {
        let key = WindowKey::normalized((4, -3), (300, 250));
        assert_eq!(key.columns(), (-3, 4));
        assert_eq!(key.rows(), (250, 255));
        assert_eq!(key, WindowKey::normalized((-3, 4), (255, 250)));
        assert_eq!(WindowKey::normalized((0, 1), (-5, -1)).rows(), (0, 0));
    }

    #[test]
    fn pixel_size_counts_rows_inclusively() {
        let key = WindowKey::normalized((0, 4), (50, 55));
        assert_eq!(key.width_in_cells(), 4);
        assert_eq!(key.height_in_cells(), 6);
        assert_eq!(key.pixel_size(), Some((64, 96)));
    }

    #[test]
    fn oversized_windows_have_no_pixel_size() {
        let wide = WindowKey::normalized((0, 300_000_000), (0, 0));
        assert_eq!(wide.pixel_size(), None);
        let extreme = WindowKey::normalized((i32::MIN, i32::MAX), (0, 255));
        assert_eq!(extreme.pixel_size(), None);
        let tall_and_wide = WindowKey::normalized((0, 1_000_000), (0, 255));
        assert_eq!(tall_and_wide.pixel_size(), None);
    }

    #[test]
    fn oldest_insertion_is_evicted_first() {
        let mut cache = WindowCache::new(2);
        let a = WindowKey::normalized((0, 1), (0, 0));
        let b = WindowKey::normalized((1, 2), (0, 0));
        let c = WindowKey::normalized((2, 3), (0, 0));

        let _ = cache.entry(a, (16, 16));
        let _ = cache.entry(b, (16, 16));
        let _ = cache.entry(a, (16, 16));
        let _ = cache.entry(c, (16, 16));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![b, c]);
    }

    #[test]
    fn zero_capacity_still_keeps_one_window() {
        let mut cache = WindowCache::new(0);
        let _ = cache.entry(WindowKey::normalized((0, 1), (0, 0)), (16, 16));
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
    }
}
