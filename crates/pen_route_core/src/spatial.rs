//! Dynamic nearest-neighbour index over node coordinates.
//!
//! Exactly coincident points share one k-d tree entry (a slot) holding every
//! id at that coordinate. Tree keys live in a fixed rotated frame: distances
//! are unchanged, but axis-aligned runs of points no longer share a split
//! value, which the bucketed tree cannot split.

use std::collections::HashMap;

use kiddo::{KdTree, SquaredEuclidean};

use crate::{Error, Result, geometry::Point};

const FRAME_SIN: f64 = 0.382_683_432_365_089_8;
const FRAME_COS: f64 = 0.923_879_532_511_286_7;

#[derive(Debug)]
struct Slot {
    key: [f64; 2],
    ids: Vec<usize>,
}

pub struct SpatialIndex {
    tree: KdTree<f64, 2>,
    slots: Vec<Slot>,
    slot_by_coord: HashMap<(u64, u64), usize>,
    slot_of: HashMap<usize, usize>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            tree: KdTree::new(),
            slots: Vec::new(),
            slot_by_coord: HashMap::new(),
            slot_of: HashMap::new(),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = (usize, Point)>) -> Self {
        let mut index = Self::new();
        for (id, point) in points {
            index.insert(id, point);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.slot_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_of.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.slot_of.contains_key(&id)
    }

    /// Indexes `id` at `point`, moving it if it was already present.
    pub fn insert(&mut self, id: usize, point: Point) {
        self.remove(id);

        let coord = coord_bits(point);
        let slot = match self.slot_by_coord.get(&coord) {
            Some(&slot) => slot,
            None => {
                let slot = self.slots.len();
                let key = frame_key(point);
                self.slots.push(Slot {
                    key,
                    ids: Vec::new(),
                });
                self.slot_by_coord.insert(coord, slot);
                slot
            }
        };

        if self.slots[slot].ids.is_empty() {
            self.tree.add(&self.slots[slot].key, slot as u64);
        }
        self.slots[slot].ids.push(id);
        self.slot_of.insert(id, slot);
    }

    /// Removes `id`; returns whether it was indexed.
    pub fn remove(&mut self, id: usize) -> bool {
        let Some(slot) = self.slot_of.remove(&id) else {
            return false;
        };
        let entry = &mut self.slots[slot];
        entry.ids.retain(|&other| other != id);
        if entry.ids.is_empty() {
            self.tree.remove(&entry.key, slot as u64);
        }
        true
    }

    /// Removes a node together with its opposite-orientation twin.
    pub fn remove_pair(&mut self, id: usize, twin: usize) {
        self.remove(id);
        self.remove(twin);
    }

    /// The indexed id closest to `point`. Among exactly equidistant ids the
    /// winner is unspecified.
    pub fn nearest(&self, point: Point) -> Result<usize> {
        if self.is_empty() {
            return Err(Error::EmptyIndex);
        }
        let nn = self.tree.nearest_one::<SquaredEuclidean>(&frame_key(point));
        self.slots
            .get(nn.item as usize)
            .and_then(|slot| slot.ids.last().copied())
            .ok_or(Error::EmptyIndex)
    }

    /// Up to `k` indexed ids in increasing distance from `point`.
    pub fn nearest_n(&self, point: Point, k: usize) -> Vec<usize> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(k);
        for nn in self.tree.nearest_n::<SquaredEuclidean>(&frame_key(point), k) {
            let Some(slot) = self.slots.get(nn.item as usize) else {
                continue;
            };
            let room = k - out.len();
            out.extend(slot.ids.iter().take(room).copied());
            if out.len() == k {
                break;
            }
        }
        out
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn frame_key(point: Point) -> [f64; 2] {
    [
        point.x * FRAME_COS - point.y * FRAME_SIN,
        point.x * FRAME_SIN + point.y * FRAME_COS,
    ]
}

/// Bit pattern of a coordinate, with `-0.0` folded into `0.0`.
#[inline]
fn coord_bits(point: Point) -> (u64, u64) {
    ((point.x + 0.0).to_bits(), (point.y + 0.0).to_bits())
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::SpatialIndex;
    use crate::{Error, geometry::Point};

    #[test]
    fn nearest_on_empty_index_is_an_empty_error() {
        let index = SpatialIndex::new();
        assert!(matches!(index.nearest(Point::ORIGIN), Err(Error::EmptyIndex)));
    }

    #[test]
    fn nearest_returns_closest_id_and_respects_removal() {
        let mut index = SpatialIndex::from_points([
            (1, Point::new(0.0, 0.0)),
            (2, Point::new(5.0, 5.0)),
            (3, Point::new(10.0, 0.0)),
        ]);

        assert_eq!(index.nearest(Point::new(9.0, 1.0)).expect("nearest"), 3);
        assert!(index.remove(3));
        assert!(!index.remove(3));
        assert_eq!(index.nearest(Point::new(9.0, 1.0)).expect("nearest"), 2);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn remove_pair_drops_both_ids() {
        let mut index = SpatialIndex::from_points([
            (1, Point::new(0.0, 0.0)),
            (2, Point::new(1.0, 0.0)),
            (3, Point::new(8.0, 0.0)),
        ]);
        index.remove_pair(1, 2);

        assert!(!index.contains(1));
        assert!(!index.contains(2));
        assert_eq!(index.nearest(Point::ORIGIN).expect("nearest"), 3);
    }

    #[test]
    fn coincident_points_are_served_until_all_are_removed() {
        let mut index = SpatialIndex::new();
        for id in 1..=100 {
            index.insert(id, Point::new(2.0, 2.0));
        }
        index.insert(500, Point::new(-0.0, 0.0));
        index.insert(501, Point::new(0.0, -0.0));

        let mut drained = Vec::new();
        while let Ok(id) = index.nearest(Point::new(2.0, 2.1)) {
            if id >= 500 {
                break;
            }
            drained.push(id);
            index.remove(id);
        }
        drained.sort_unstable();
        assert_eq!(drained, (1..=100).collect::<Vec<_>>());

        let zero = index.nearest(Point::ORIGIN).expect("signed zeros");
        assert!(zero == 500 || zero == 501);
        index.remove_pair(500, 501);
        assert!(index.is_empty());
    }

    #[test]
    fn axis_aligned_grids_do_not_break_the_tree() {
        let mut index = SpatialIndex::new();
        let mut id = 0;
        for x in 0..60 {
            for y in 0..60 {
                index.insert(id, Point::new(f64::from(x), f64::from(y)));
                id += 1;
            }
        }
        assert_eq!(index.len(), 3600);
        assert_eq!(index.nearest(Point::new(59.2, 0.1)).expect("nearest"), 59 * 60);
    }

    #[test]
    fn nearest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(99);
        let points: Vec<Point> = (0..300)
            .map(|_| Point::new(rng.random_range(-100.0..100.0), rng.random_range(-100.0..100.0)))
            .collect();
        let mut index = SpatialIndex::from_points(points.iter().copied().enumerate());

        for round in 0..150 {
            let query = Point::new(rng.random_range(-120.0..120.0), rng.random_range(-120.0..120.0));
            let got = index.nearest(query).expect("non-empty");
            let best = (0..points.len())
                .filter(|&id| index.contains(id))
                .map(|id| query.dist(points[id]))
                .fold(f64::INFINITY, f64::min);
            assert!((query.dist(points[got]) - best).abs() < 1e-9, "round {round}");
            index.remove(got);
        }
    }

    #[test]
    fn nearest_n_expands_coincident_slots_in_distance_order() {
        let index = SpatialIndex::from_points([
            (1, Point::new(1.0, 0.0)),
            (2, Point::new(1.0, 0.0)),
            (3, Point::new(3.0, 0.0)),
            (4, Point::new(9.0, 0.0)),
        ]);

        let mut near = index.nearest_n(Point::ORIGIN, 2);
        near.sort_unstable();
        assert_eq!(near, vec![1, 2]);

        let three = index.nearest_n(Point::ORIGIN, 3);
        assert_eq!(three.len(), 3);
        assert_eq!(three[2], 3);
        assert_eq!(index.nearest_n(Point::ORIGIN, 10).len(), 4);
    }
}
