use std::time::{Duration, Instant};

use crate::{
    GlsError, GlsResult, Metaheuristic, RoutingModel, SearchParameters,
    candidates::{Direction, nearest_by_cost},
    search::{DescentOutcome, LocalSearch},
};

/// Upper bound for deadlines so `Instant` arithmetic cannot overflow.
const MAX_TIME_LIMIT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

type Monitor<'a> = Box<dyn FnMut(&SearchProgress) + 'a>;

/// Reported every time the search finds a route cheaper than all before it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchProgress {
    pub cost: i64,
    pub elapsed: Duration,
    pub iteration: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    /// Visited nodes in order, depot excluded.
    pub route: Vec<usize>,
    pub cost: i64,
    /// Penalty rounds completed.
    pub iterations: usize,
    /// Times the best route was replaced.
    pub improvements: usize,
}

pub struct Solver<'a> {
    model: RoutingModel<'a>,
    params: SearchParameters,
    initial: Option<Vec<usize>>,
    monitor: Option<Monitor<'a>>,
}

impl<'a> Solver<'a> {
    pub fn new(model: RoutingModel<'a>, params: SearchParameters) -> Self {
        Self {
            model,
            params,
            initial: None,
            monitor: None,
        }
    }

    /// Starts the search from `route` instead of the model's default route.
    pub fn seed(&mut self, route: Vec<usize>) -> GlsResult<()> {
        self.model.validate_route(&route)?;
        self.initial = Some(route);
        Ok(())
    }

    pub fn on_solution(&mut self, monitor: impl FnMut(&SearchProgress) + 'a) {
        self.monitor = Some(Box::new(monitor));
    }

    pub fn solve(mut self) -> GlsResult<Solution> {
        let started = Instant::now();
        let deadline = started + self.params.time_limit.min(MAX_TIME_LIMIT);

        let initial = match self.initial.take() {
            Some(route) => route,
            None => {
                let route = self.model.default_route();
                self.model
                    .validate_route(&route)
                    .map_err(|err| GlsError::infeasible(err.to_string()))?;
                route
            }
        };

        let mut best_cost = self.model.route_cost(&initial);
        let mut best = initial.clone();
        let mut iterations = 0usize;
        let mut improvements = 0usize;

        log::debug!(
            "gls: start nodes={} route_len={} seed_cost={} time_limit={:.1}s metaheuristic={:?}",
            self.model.node_count(),
            initial.len(),
            best_cost,
            self.params.time_limit.as_secs_f64(),
            self.params.metaheuristic,
        );
        report(&mut self.monitor, best_cost, started, 0);

        if initial.is_empty() {
            return Ok(Solution {
                route: best,
                cost: best_cost,
                iterations,
                improvements,
            });
        }

        let k = self.params.candidate_count;
        let successors = match self.model.successors.take() {
            Some(lists) => lists,
            None => nearest_by_cost(&self.model, k, Direction::Outgoing),
        };
        let predecessors = match self.model.predecessors.take() {
            Some(lists) => lists,
            None => nearest_by_cost(&self.model, k, Direction::Incoming),
        };

        let mut search = LocalSearch::new(
            &self.model,
            &successors,
            &predecessors,
            initial,
            self.params.seed,
            deadline,
        );

        loop {
            let outcome = search.descend();
            let cost = self.model.route_cost(search.route());
            if cost < best_cost {
                best_cost = cost;
                best.clear();
                best.extend_from_slice(search.route());
                improvements += 1;
                log::trace!("gls: improved cost={cost} iteration={iterations}");
                report(&mut self.monitor, best_cost, started, iterations);
            }

            if outcome == DescentOutcome::Deadline
                || self.params.metaheuristic == Metaheuristic::GreedyDescent
                || search.route().len() <= 1
                || self.params.max_iterations.is_some_and(|max| iterations >= max)
            {
                break;
            }

            if search.lambda() == 0 {
                let arcs = (search.route().len() + 1) as f64;
                let lambda = (self.params.lambda_coefficient * cost as f64 / arcs).round() as i64;
                search.set_lambda(lambda.max(1));
            }
            search.penalize();
            iterations += 1;
        }

        debug_assert!(self.model.validate_route(&best).is_ok());
        log::debug!(
            "gls: complete cost={} iterations={} improvements={} moves={} elapsed={:.3}s",
            best_cost,
            iterations,
            improvements,
            search.moves(),
            started.elapsed().as_secs_f64()
        );

        Ok(Solution {
            route: best,
            cost: best_cost,
            iterations,
            improvements,
        })
    }
}

fn report(monitor: &mut Option<Monitor<'_>>, cost: i64, started: Instant, iteration: usize) {
    if let Some(monitor) = monitor.as_mut() {
        monitor(&SearchProgress {
            cost,
            elapsed: started.elapsed(),
            iteration,
        });
    }
}
