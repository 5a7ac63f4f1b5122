//! Directed endpoint model over a set of physical paths.
//!
//! For `n` paths the graph has `2n + 1` nodes. Node `0` is the origin, node
//! `2k - 1` draws path `k` forward and node `2k` draws it backward. The two
//! orientation nodes of one path form a disjoint pair: a tour contains
//! exactly one of them.

use crate::{
    Error, Result,
    geometry::{Point, Polyline},
};

pub const ORIGIN: usize = 0;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// A non-origin node split into its zero-based physical path index and the
/// direction it is drawn in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId {
    pub path: usize,
    pub orientation: Orientation,
}

impl NodeId {
    pub fn new(path: usize, orientation: Orientation) -> Self {
        Self { path, orientation }
    }

    /// `None` for the origin.
    pub fn decode(node: usize) -> Option<Self> {
        if node == ORIGIN {
            return None;
        }
        let orientation = if (node - 1) % 2 == 0 {
            Orientation::Forward
        } else {
            Orientation::Reverse
        };
        Some(Self::new((node - 1) / 2, orientation))
    }

    pub fn index(self) -> usize {
        match self.orientation {
            Orientation::Forward => 2 * self.path + 1,
            Orientation::Reverse => 2 * self.path + 2,
        }
    }

    pub fn twin(self) -> Self {
        Self::new(self.path, self.orientation.flipped())
    }
}

#[derive(Clone, Debug)]
pub struct PathGraph {
    paths: Vec<Polyline>,
    origin: Point,
    /// `(start, end)` per node, origin included.
    endpoints: Vec<(Point, Point)>,
}

impl PathGraph {
    pub fn build(paths: Vec<Polyline>, origin: Point) -> Result<Self> {
        if !origin.is_finite() {
            return Err(Error::invalid_input(format!(
                "origin has non-finite coordinates: {origin}"
            )));
        }

        let mut endpoints = Vec::with_capacity(2 * paths.len() + 1);
        endpoints.push((origin, origin));

        for (idx, path) in paths.iter().enumerate() {
            if path.is_empty() {
                return Err(Error::invalid_input(format!("path {} has no points", idx + 1)));
            }
            if !path.is_finite() {
                return Err(Error::invalid_input(format!(
                    "path {} has non-finite coordinates",
                    idx + 1
                )));
            }
            let (start, end) = (path.start(), path.end());
            endpoints.push((start, end));
            endpoints.push((end, start));
        }

        log::debug!(
            "graph: built paths={} nodes={}",
            paths.len(),
            endpoints.len()
        );

        Ok(Self {
            paths,
            origin,
            endpoints,
        })
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn node_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn endpoints(&self, node: usize) -> (Point, Point) {
        self.endpoints[node]
    }

    #[inline]
    pub fn start(&self, node: usize) -> Point {
        self.endpoints[node].0
    }

    #[inline]
    pub fn end(&self, node: usize) -> Point {
        self.endpoints[node].1
    }

    /// Pen-up distance from the end of `from` to the start of `to`.
    #[inline]
    pub fn cost(&self, from: usize, to: usize) -> f64 {
        self.end(from).dist(self.start(to))
    }

    /// The path drawn by `node`, reversed for reverse-orientation nodes.
    /// The origin has no path.
    pub fn oriented_path(&self, node: usize) -> Option<Polyline> {
        let id = NodeId::decode(node)?;
        let path = self.paths.get(id.path)?;
        Some(match id.orientation {
            Orientation::Forward => path.clone(),
            Orientation::Reverse => path.reversed(),
        })
    }

    /// The opposite orientation of the same path. The origin is its own twin.
    #[inline]
    pub fn disjoint_of(&self, node: usize) -> usize {
        NodeId::decode(node).map_or(ORIGIN, |id| id.twin().index())
    }

    /// 1-based number of the physical path drawn by `node`.
    pub fn physical_id(&self, node: usize) -> Option<usize> {
        NodeId::decode(node).map(|id| id.path + 1)
    }

    pub fn contains_node(&self, node: usize) -> bool {
        node != ORIGIN && node < self.node_count()
    }

    /// `[forward, reverse]` for every path, in path order.
    pub fn disjunction_pairs(&self) -> impl Iterator<Item = [usize; 2]> + '_ {
        (0..self.path_count()).map(|path| {
            let forward = NodeId::new(path, Orientation::Forward);
            [forward.index(), forward.twin().index()]
        })
    }

    /// Every node except the origin with its start point.
    pub fn starts(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        self.endpoints
            .iter()
            .enumerate()
            .skip(1)
            .map(|(node, &(start, _))| (node, start))
    }

    /// Every node except the origin with its end point.
    pub fn ends(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        self.endpoints
            .iter()
            .enumerate()
            .skip(1)
            .map(|(node, &(_, end))| (node, end))
    }
}
