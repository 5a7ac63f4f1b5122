//! End-to-end routing run: greedy ordering, optional refinement, optional
//! merging, with the pen-up cost reported after every stage.

use pen_route_derive::{KvDisplay, timer};

use crate::{
    Error, Result,
    geometry::Polyline,
    graph::PathGraph,
    greedy::GreedyRouter,
    io::options::RouterOptions,
    optimizer::{OptimizedTour, RouteOptimizer},
    route::{join_close_paths, to_oriented_paths, tour_cost},
};

#[derive(Clone, Debug, KvDisplay)]
pub struct RouteReport {
    #[kv(skip)]
    pub route: Vec<Polyline>,
    /// Pen-up travel of the input order.
    #[kv(fmt = "float")]
    pub initial_cost: f64,
    #[kv(fmt = "opt")]
    pub greedy_cost: Option<f64>,
    /// Absent when only the greedy pass ran or the optimizer fell back.
    #[kv(fmt = "opt")]
    pub optimized_cost: Option<f64>,
    pub paths_before_merge: usize,
    pub paths_after_merge: usize,
}

impl RouteReport {
    /// Cost of the route as written, before any merging.
    pub fn final_cost(&self) -> f64 {
        self.optimized_cost
            .or(self.greedy_cost)
            .unwrap_or(self.initial_cost)
    }
}

#[timer("pipeline.run")]
pub fn run(paths: Vec<Polyline>, options: &RouterOptions) -> Result<RouteReport> {
    let origin = options.origin;
    let initial_cost = tour_cost(&paths, origin);
    let drawn: f64 = paths.iter().map(Polyline::drawn_length).sum();
    log::info!(
        "pipeline: initial paths={} drawn={drawn:.4} cost={initial_cost:.4}",
        paths.len()
    );

    if options.no_opt {
        let count = paths.len();
        return Ok(RouteReport {
            route: paths,
            initial_cost,
            greedy_cost: None,
            optimized_cost: None,
            paths_before_merge: count,
            paths_after_merge: count,
        });
    }

    let graph = PathGraph::build(paths, origin)?;
    let greedy_tour = GreedyRouter::new(&graph).route()?;
    let greedy_route = to_oriented_paths(&greedy_tour, &graph)?;
    let greedy_cost = tour_cost(&greedy_route, origin);
    log::info!("pipeline: greedy cost={greedy_cost:.4}");

    let (route, optimized_cost) = if options.greedy {
        (greedy_route, None)
    } else {
        let optimized = RouteOptimizer::new(&graph)
            .with_time_limit(options.time_limit())
            .with_seed(options.seed)
            .optimize(Some(&greedy_tour));
        optimized_or_greedy(optimized, greedy_route, &graph)?
    };

    let paths_before_merge = route.len();
    let route = match options.merge_threshold() {
        Some(threshold) => {
            let merged = join_close_paths(&route, threshold);
            log::info!(
                "pipeline: merged before={paths_before_merge} after={} threshold={threshold}",
                merged.len()
            );
            merged
        }
        None => route,
    };

    Ok(RouteReport {
        paths_after_merge: route.len(),
        route,
        initial_cost,
        greedy_cost: Some(greedy_cost),
        optimized_cost,
        paths_before_merge,
    })
}

/// The optimized route and its cost, or the greedy route when the search
/// found nothing feasible. Every other failure is returned.
fn optimized_or_greedy(
    optimized: Result<OptimizedTour>,
    greedy_route: Vec<Polyline>,
    graph: &PathGraph,
) -> Result<(Vec<Polyline>, Option<f64>)> {
    match optimized {
        Ok(result) => {
            let route = to_oriented_paths(&result.tour, graph)?;
            let cost = tour_cost(&route, graph.origin());
            log::info!(
                "pipeline: optimized cost={cost:.4} arc_precision={}",
                result.precision
            );
            Ok((route, Some(cost)))
        }
        Err(Error::SolverInfeasible(reason)) => {
            log::warn!("pipeline: optimizer failed, keeping greedy tour: {reason}");
            Ok((greedy_route, None))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{RouteReport, optimized_or_greedy, run};
    use crate::{
        Error,
        geometry::{Point, Polyline},
        graph::PathGraph,
        io::options::RouterOptions,
        optimizer::OptimizedTour,
    };

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
        Polyline::segment(Point::new(x0, y0), Point::new(x1, y1))
    }

    fn scattered() -> Vec<Polyline> {
        vec![
            seg(10.0, 10.0, 11.0, 10.0),
            seg(0.0, 1.0, 0.0, 2.0),
            seg(12.0, 10.0, 11.0, 10.0),
            seg(0.0, 3.0, 0.0, 2.0),
        ]
    }

    #[test]
    fn no_opt_passes_input_through() {
        let options = RouterOptions {
            no_opt: true,
            merge_paths: Some(100.0),
            ..RouterOptions::default()
        };
        let report = run(scattered(), &options).expect("run");

        assert_eq!(report.route, scattered());
        assert!(report.greedy_cost.is_none());
        assert_eq!(report.paths_after_merge, 4);
        assert_eq!(report.final_cost(), report.initial_cost);
    }

    #[test]
    fn greedy_only_improves_on_input_order() {
        let options = RouterOptions {
            greedy: true,
            ..RouterOptions::default()
        };
        let report = run(scattered(), &options).expect("run");

        let greedy = report.greedy_cost.expect("greedy ran");
        assert!(greedy < report.initial_cost);
        assert!(report.optimized_cost.is_none());
        assert_eq!(report.route.len(), 4);
    }

    #[test]
    fn merging_joins_touching_paths() {
        let options = RouterOptions {
            greedy: true,
            merge_paths: Some(0.5),
            ..RouterOptions::default()
        };
        let report = run(scattered(), &options).expect("run");

        // Two chains of two touching paths each.
        assert_eq!(report.paths_before_merge, 4);
        assert_eq!(report.paths_after_merge, 2);
        assert_eq!(report.route.len(), 2);
    }

    #[test]
    fn infeasible_search_falls_back_to_the_greedy_route() {
        let graph = PathGraph::build(scattered(), Point::ORIGIN).expect("graph");
        let greedy = scattered();

        let (route, cost) = optimized_or_greedy(
            Err(Error::solver_infeasible("no route before the deadline")),
            greedy.clone(),
            &graph,
        )
        .expect("fallback");

        assert_eq!(route, greedy);
        assert_eq!(cost, None);
    }

    #[test]
    fn contract_errors_are_not_papered_over() {
        let graph = PathGraph::build(scattered(), Point::ORIGIN).expect("graph");
        let invalid = Error::InvalidSolution {
            differences: BTreeMap::from([(1, 1)]),
        };

        let err = optimized_or_greedy(Err(invalid), scattered(), &graph).expect_err("surfaced");
        assert!(matches!(err, Error::InvalidSolution { .. }));

        let err = optimized_or_greedy(Err(Error::other("bad model")), scattered(), &graph)
            .expect_err("surfaced");
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn optimized_tours_are_decoded_with_their_cost() {
        let graph = PathGraph::build(scattered(), Point::ORIGIN).expect("graph");
        let tour = OptimizedTour {
            tour: vec![3, 7, 2, 5],
            cost: 0.0,
            precision: 1e-4,
        };

        let (route, cost) = optimized_or_greedy(Ok(tour), Vec::new(), &graph).expect("decoded");
        assert_eq!(route.len(), 4);
        assert_eq!(route[0], scattered()[1]);
        assert!(cost.is_some_and(|c| c > 0.0));
    }

    #[test]
    fn report_display_lists_costs() {
        let report = RouteReport {
            route: Vec::new(),
            initial_cost: 1.5,
            greedy_cost: Some(1.0),
            optimized_cost: None,
            paths_before_merge: 3,
            paths_after_merge: 2,
        };
        let shown = report.to_string();
        assert!(shown.contains("initial_cost       = 1.5000"));
        assert!(shown.contains("optimized_cost     = none"));
        assert!(!shown.contains("route "));
    }
}
