//! Uniform-cell spatial hash for broad-phase proximity queries
//!
//! Hashes axis-aligned bounds into cubic cells of configurable size so the
//! number of collision/query candidates stays bounded by local density
//! instead of total entity count. Queries may return false positives
//! (entities sharing a cell without actually overlapping) which callers must
//! narrow-phase-verify; they never return false negatives.

use crate::foundation::math::{Aabb, Vec3};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Integer cell coordinate, `floor(coord / cell_size)` per axis
pub type CellKey = (i32, i32, i32);

/// Per-entity record: the bounds it was last filed under and the cells
/// covering them
///
/// The cell list doubles as the removal/update index: it must always exactly
/// equal the cells covering `bounds`, or queries return false negatives.
#[derive(Debug, Clone)]
struct EntityRecord {
    bounds: Aabb,
    cells: Vec<CellKey>,
}

/// Uniform-cell spatial hash over axis-aligned bounds
///
/// Generic over the entity key so the structure carries no dependency on
/// physics types. Cell iteration order is unspecified; callers must treat
/// query results as sets.
///
/// An entity whose bounds span many cells costs O(cells covered) per
/// insert/update, so the cell size should be tuned near the typical entity
/// size. That is a caller-level knob (`PhysicsConfig::cell_size`), not
/// something the grid self-corrects.
#[derive(Debug, Clone)]
pub struct SpatialGrid<K: Copy + Eq + Hash> {
    /// Edge length of a cubic cell
    cell_size: f32,

    /// Cell -> entities occupying it
    cells: HashMap<CellKey, HashSet<K>>,

    /// Entity -> its current bounds and occupied cells
    entities: HashMap<K, EntityRecord>,
}

impl<K: Copy + Eq + Hash> SpatialGrid<K> {
    /// Create a new grid with the given cell size
    ///
    /// A non-positive cell size would put every entity in the same cell (or
    /// divide by zero), so it degrades to 1.0 with a warning.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            log::warn!("non-positive grid cell size {cell_size}, using 1.0");
            1.0
        };

        Self {
            cell_size,
            cells: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Get the configured cell size
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of entities currently stored
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check whether the grid holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Cell coordinate containing a world-space point
    fn cell_coord(&self, value: f32) -> i32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            (value / self.cell_size).floor() as i32
        }
    }

    /// Inclusive cell-coordinate range covered by the given bounds
    fn cell_range(&self, bounds: &Aabb) -> (CellKey, CellKey) {
        (
            (
                self.cell_coord(bounds.min.x),
                self.cell_coord(bounds.min.y),
                self.cell_coord(bounds.min.z),
            ),
            (
                self.cell_coord(bounds.max.x),
                self.cell_coord(bounds.max.y),
                self.cell_coord(bounds.max.z),
            ),
        )
    }

    /// All cells covered by the given bounds (per-axis range cross product)
    fn covered_cells(&self, bounds: &Aabb) -> Vec<CellKey> {
        let ((min_x, min_y, min_z), (max_x, max_y, max_z)) = self.cell_range(bounds);

        let span = (i128::from(max_x) - i128::from(min_x) + 1)
            * (i128::from(max_y) - i128::from(min_y) + 1)
            * (i128::from(max_z) - i128::from(min_z) + 1);
        let capacity = usize::try_from(span).unwrap_or(usize::MAX).min(1024);
        let mut keys = Vec::with_capacity(capacity);
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    keys.push((x, y, z));
                }
            }
        }
        keys
    }

    /// Insert an entity with the given bounds
    ///
    /// Re-inserting a known entity behaves like [`SpatialGrid::update`].
    pub fn insert(&mut self, key: K, bounds: Aabb) {
        if self.entities.contains_key(&key) {
            self.update(key, bounds);
            return;
        }

        let cells = self.covered_cells(&bounds);
        for cell in &cells {
            self.cells.entry(*cell).or_default().insert(key);
        }
        self.entities.insert(key, EntityRecord { bounds, cells });
    }

    /// Move an entity to new bounds
    ///
    /// Only the changed cells are touched: the entity is removed from cells
    /// present in the old set but not the new, and added to cells present in
    /// the new set but not the old. Small moves that stay within the same
    /// cells cost nothing. Unknown entities are inserted.
    pub fn update(&mut self, key: K, new_bounds: Aabb) {
        let Some(record) = self.entities.get(&key) else {
            self.insert(key, new_bounds);
            return;
        };

        let new_cells = self.covered_cells(&new_bounds);
        let old_set: HashSet<CellKey> = record.cells.iter().copied().collect();
        let new_set: HashSet<CellKey> = new_cells.iter().copied().collect();

        for cell in old_set.difference(&new_set) {
            if let Some(members) = self.cells.get_mut(cell) {
                members.remove(&key);
                if members.is_empty() {
                    self.cells.remove(cell);
                }
            }
        }
        for cell in new_set.difference(&old_set) {
            self.cells.entry(*cell).or_default().insert(key);
        }

        self.entities.insert(
            key,
            EntityRecord {
                bounds: new_bounds,
                cells: new_cells,
            },
        );
    }

    /// Remove an entity from the grid
    ///
    /// Returns `false` for entities that were never inserted or were already
    /// removed; never panics.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(record) = self.entities.remove(&key) else {
            return false;
        };

        for cell in &record.cells {
            if let Some(members) = self.cells.get_mut(cell) {
                members.remove(&key);
                if members.is_empty() {
                    self.cells.remove(cell);
                }
            }
        }
        true
    }

    /// All entities in cells overlapping the given bounds
    ///
    /// Superset of the exact intersection set: false positives possible,
    /// false negatives never. Results are deduplicated but unordered.
    ///
    /// Huge query bounds (e.g. a raycast across the whole world) would cover
    /// more cells than exist, so the scan flips to iterating occupied cells
    /// once that is cheaper; cost is O(min(cells covered, occupied cells)).
    pub fn query(&self, bounds: &Aabb) -> Vec<K> {
        let ((min_x, min_y, min_z), (max_x, max_y, max_z)) = self.cell_range(bounds);
        let span = (i128::from(max_x) - i128::from(min_x) + 1)
            * (i128::from(max_y) - i128::from(min_y) + 1)
            * (i128::from(max_z) - i128::from(min_z) + 1);

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut collect = |members: &HashSet<K>| {
            for &key in members {
                if seen.insert(key) {
                    results.push(key);
                }
            }
        };

        if span > self.cells.len() as i128 {
            for (&(x, y, z), members) in &self.cells {
                if x >= min_x && x <= max_x && y >= min_y && y <= max_y && z >= min_z && z <= max_z
                {
                    collect(members);
                }
            }
        } else {
            for x in min_x..=max_x {
                for y in min_y..=max_y {
                    for z in min_z..=max_z {
                        if let Some(members) = self.cells.get(&(x, y, z)) {
                            collect(members);
                        }
                    }
                }
            }
        }
        results
    }

    /// All entities whose recorded bounds center lies within `radius` of
    /// `point`
    ///
    /// Box-query using the radius as a cube half-extent, then filters
    /// candidates by exact squared center distance.
    pub fn query_radius(&self, point: Vec3, radius: f32) -> Vec<K> {
        let cube = Aabb::from_sphere(point, radius);
        let radius_sq = radius * radius;

        self.query(&cube)
            .into_iter()
            .filter(|key| {
                self.entities.get(key).is_some_and(|record| {
                    (record.bounds.center() - point).magnitude_squared() <= radius_sq
                })
            })
            .collect()
    }

    /// Recorded bounds for an entity, if present
    pub fn bounds_of(&self, key: K) -> Option<Aabb> {
        self.entities.get(&key).map(|record| record.bounds)
    }

    /// Check whether an entity is stored
    pub fn contains(&self, key: K) -> bool {
        self.entities.contains_key(&key)
    }

    /// Drop all entities and cells
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds(center: Vec3) -> Aabb {
        Aabb::from_center_extents(center, Vec3::new(0.5, 0.5, 0.5))
    }

    fn as_set(keys: Vec<u32>) -> HashSet<u32> {
        keys.into_iter().collect()
    }

    #[test]
    fn test_insert_and_query() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(2.0);

        grid.insert(1, unit_bounds(Vec3::new(0.0, 0.0, 0.0)));
        grid.insert(2, unit_bounds(Vec3::new(0.5, 0.0, 0.0)));
        grid.insert(3, unit_bounds(Vec3::new(50.0, 0.0, 0.0)));

        let near = as_set(grid.query(&unit_bounds(Vec3::new(0.0, 0.0, 0.0))));
        assert!(near.contains(&1));
        assert!(near.contains(&2));
        assert!(!near.contains(&3));
    }

    #[test]
    fn test_query_is_superset_of_exact_overlaps() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(4.0);

        let bounds: Vec<(u32, Aabb)> = (0..20)
            .map(|i| {
                let center = Vec3::new(f32::from(i16::try_from(i).unwrap()) * 0.7, 0.0, 0.0);
                (i, unit_bounds(center))
            })
            .collect();
        for (key, aabb) in &bounds {
            grid.insert(*key, *aabb);
        }

        let probe = Aabb::new(Vec3::new(2.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let candidates = as_set(grid.query(&probe));

        // Every exactly-overlapping entity must appear among the candidates.
        for (key, aabb) in &bounds {
            if aabb.intersects(&probe) {
                assert!(candidates.contains(key), "false negative for {key}");
            }
        }
    }

    #[test]
    fn test_entity_spanning_many_cells_is_found_everywhere() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(1.0);

        let big = Aabb::new(Vec3::new(-3.0, -3.0, -3.0), Vec3::new(3.0, 3.0, 3.0));
        grid.insert(7, big);

        for x in [-2.5, 0.0, 2.5] {
            let probe = unit_bounds(Vec3::new(x, 0.0, 0.0));
            assert!(as_set(grid.query(&probe)).contains(&7));
        }
    }

    #[test]
    fn test_update_moves_between_cells() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(2.0);

        grid.insert(1, unit_bounds(Vec3::new(0.0, 0.0, 0.0)));
        grid.update(1, unit_bounds(Vec3::new(40.0, 0.0, 0.0)));

        let old_spot = as_set(grid.query(&unit_bounds(Vec3::new(0.0, 0.0, 0.0))));
        assert!(!old_spot.contains(&1), "stale cell membership after move");

        let new_spot = as_set(grid.query(&unit_bounds(Vec3::new(40.0, 0.0, 0.0))));
        assert!(new_spot.contains(&1));
    }

    #[test]
    fn test_update_unknown_key_inserts() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(2.0);
        grid.update(9, unit_bounds(Vec3::zeros()));
        assert!(grid.contains(9));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_remove_clears_all_cells() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(1.0);

        // Spans multiple cells on purpose.
        grid.insert(1, Aabb::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0)));
        assert!(grid.remove(1));

        let probe = Aabb::new(Vec3::new(-3.0, -1.0, -1.0), Vec3::new(3.0, 2.0, 2.0));
        assert!(grid.query(&probe).is_empty());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(1.0);
        assert!(!grid.remove(42));

        grid.insert(1, unit_bounds(Vec3::zeros()));
        assert!(grid.remove(1));
        assert!(!grid.remove(1), "second remove must report false");
    }

    #[test]
    fn test_query_radius_filters_by_exact_distance() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(10.0);

        // Same cell, different distances from the probe point.
        grid.insert(1, unit_bounds(Vec3::new(1.0, 0.0, 0.0)));
        grid.insert(2, unit_bounds(Vec3::new(4.0, 0.0, 0.0)));

        let hits = as_set(grid.query_radius(Vec3::zeros(), 2.0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2), "cube-query false positive leaked through");
    }

    #[test]
    fn test_query_radius_boundary_is_inclusive() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(2.0);
        grid.insert(1, unit_bounds(Vec3::new(3.0, 0.0, 0.0)));

        let hits = as_set(grid.query_radius(Vec3::zeros(), 3.0));
        assert!(hits.contains(&1));
    }

    #[test]
    fn test_degenerate_cell_size_degrades() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(-5.0);
        assert!((grid.cell_size() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_clear() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(1.0);
        grid.insert(1, unit_bounds(Vec3::zeros()));
        grid.insert(2, unit_bounds(Vec3::new(5.0, 0.0, 0.0)));

        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(&unit_bounds(Vec3::zeros())).is_empty());
    }
}
