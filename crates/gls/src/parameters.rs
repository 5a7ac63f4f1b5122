use std::time::Duration;

/// Strategy applied once plain descent reaches a local optimum.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Metaheuristic {
    /// Stop at the first local optimum.
    GreedyDescent,
    /// Penalize high-utility arcs of each local optimum and keep searching
    /// until the time limit.
    #[default]
    GuidedLocalSearch,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchParameters {
    /// Wall-clock budget counted from `Solver::solve`, including candidate
    /// lists computed there. Lists supplied with the model are built by the
    /// caller on its own clock.
    pub time_limit: Duration,
    pub metaheuristic: Metaheuristic,
    /// Scales the penalty weight relative to the mean arc cost of the first
    /// local optimum.
    pub lambda_coefficient: f64,
    /// Neighbours kept per node when candidate lists are computed here.
    pub candidate_count: usize,
    pub seed: u64,
    /// Optional cap on penalty rounds; `None` runs until the time limit.
    pub max_iterations: Option<usize>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            metaheuristic: Metaheuristic::default(),
            lambda_coefficient: 0.1,
            candidate_count: 16,
            seed: 12_345,
            max_iterations: None,
        }
    }
}

impl SearchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_metaheuristic(mut self, metaheuristic: Metaheuristic) -> Self {
        self.metaheuristic = metaheuristic;
        self
    }

    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = candidate_count.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}
