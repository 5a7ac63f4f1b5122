use std::collections::BTreeMap;

use crate::{
    Error, Result,
    geometry::{Point, Polyline},
    graph::PathGraph,
};

/// Checks that `tour` draws every physical path exactly once.
///
/// On failure the error maps each offending path number to
/// `expected - actual` visits. Node ids outside the graph are reported under
/// their own id with an expected count of zero.
pub fn validate(tour: &[usize], graph: &PathGraph) -> Result<()> {
    let n = graph.path_count();
    let mut visits = vec![0i64; n + 1];
    let mut differences: BTreeMap<usize, i64> = BTreeMap::new();

    for &node in tour {
        match graph.physical_id(node).filter(|_| graph.contains_node(node)) {
            Some(path) => visits[path] += 1,
            None => *differences.entry(node).or_insert(0) -= 1,
        }
    }
    for (path, &count) in visits.iter().enumerate().skip(1) {
        if count != 1 {
            differences.insert(path, 1 - count);
        }
    }

    if differences.is_empty() {
        return Ok(());
    }
    log::debug!("route: invalid tour len={} differences={differences:?}", tour.len());
    Err(Error::InvalidSolution { differences })
}

/// The oriented paths a valid `tour` draws, in order.
pub fn to_oriented_paths(tour: &[usize], graph: &PathGraph) -> Result<Vec<Polyline>> {
    validate(tour, graph)?;
    tour.iter()
        .map(|&node| {
            graph
                .oriented_path(node)
                .ok_or_else(|| Error::other(format!("node {node} has no path")))
        })
        .collect()
}

/// Merges consecutive paths whose gap is strictly below `threshold`,
/// bridging each gap with a straight pen-down connector.
pub fn join_close_paths(route: &[Polyline], threshold: f64) -> Vec<Polyline> {
    let mut merged: Vec<Polyline> = Vec::new();
    let mut current: Option<Polyline> = None;

    for path in route {
        match current.as_mut() {
            Some(acc) if acc.end().dist(path.start()) < threshold => {
                let skip = usize::from(acc.end() == path.start());
                acc.points.extend(path.points.iter().skip(skip).copied());
            }
            _ => {
                if let Some(done) = current.replace(path.clone()) {
                    merged.push(done);
                }
            }
        }
    }
    merged.extend(current);

    log::debug!(
        "route: merged before={} after={} threshold={threshold}",
        route.len(),
        merged.len()
    );
    merged
}

/// Pen-up travel of drawing `route` in order, starting and ending at
/// `origin`. Drawn lengths are not included.
pub fn tour_cost(route: &[Polyline], origin: Point) -> f64 {
    let (Some(first), Some(last)) = (route.first(), route.last()) else {
        return 0.0;
    };
    let gaps: f64 = route.windows(2).map(|w| w[0].end().dist(w[1].start())).sum();
    origin.dist(first.start()) + gaps + last.end().dist(origin)
}
