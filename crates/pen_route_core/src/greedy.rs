use std::time::Instant;

use pen_route_derive::timer;

use crate::{
    Error, Result,
    geometry::Point,
    graph::{ORIGIN, PathGraph},
    spatial::SpatialIndex,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Running,
    Done,
}

/// Nearest-neighbour walk: from the current pen position, draw the closest
/// undrawn path start next, in whichever orientation that start belongs to.
pub struct GreedyRouter<'g> {
    graph: &'g PathGraph,
    index: SpatialIndex,
}

impl<'g> GreedyRouter<'g> {
    pub fn new(graph: &'g PathGraph) -> Self {
        Self {
            graph,
            index: SpatialIndex::from_points(graph.starts()),
        }
    }

    /// A feasible tour with one node per path. Running out of candidates is
    /// the normal stop; any other index error is returned.
    #[timer("greedy.route")]
    pub fn route(mut self) -> Result<Vec<usize>> {
        let started = Instant::now();
        let mut tour = Vec::with_capacity(self.graph.path_count());
        let mut location: Point = self.graph.start(ORIGIN);
        let mut state = State::Running;

        while state == State::Running {
            match self.index.nearest(location) {
                Ok(next) => {
                    tour.push(next);
                    location = self.graph.end(next);
                    self.index.remove_pair(next, self.graph.disjoint_of(next));
                }
                Err(Error::EmptyIndex) => state = State::Done,
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "greedy: complete n={} elapsed={:.3}s",
            tour.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(tour)
    }
}
