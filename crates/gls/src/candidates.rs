use rayon::prelude::*;

use crate::RoutingModel;

#[derive(Clone, Copy, Debug)]
pub(crate) enum Direction {
    /// `i -> j` arcs, ranked by `cost(i, j)`.
    Outgoing,
    /// `j -> i` arcs, ranked by `cost(j, i)`.
    Incoming,
}

/// The `k` cheapest non-depot neighbours of every node, best first.
pub(crate) fn nearest_by_cost(
    model: &RoutingModel<'_>,
    k: usize,
    direction: Direction,
) -> Vec<Vec<usize>> {
    let n = model.node_count();
    let depot = model.depot();

    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut ranked: Vec<(i64, usize)> = (0..n)
                .filter(|&j| j != i && j != depot)
                .map(|j| {
                    let cost = match direction {
                        Direction::Outgoing => model.arc_cost(i, j),
                        Direction::Incoming => model.arc_cost(j, i),
                    };
                    (cost, j)
                })
                .collect();

            let keep = k.min(ranked.len());
            if keep < ranked.len() {
                ranked.select_nth_unstable(keep);
                ranked.truncate(keep);
            }
            ranked.sort_unstable();
            ranked.into_iter().map(|(_, j)| j).collect()
        })
        .collect()
}
