//! In-process single-vehicle routing with disjunctions, solved by local
//! search under a guided-local-search metaheuristic.
//!
//! ```no_run
//! use std::time::Duration;
//! use gls::{RoutingModel, SearchParameters, Solver};
//!
//! let mut model = RoutingModel::new(5, 0, |a, b| (a as i64 - b as i64).abs())?;
//! model.add_disjunction(1, 2)?;
//! model.add_disjunction(3, 4)?;
//!
//! let params = SearchParameters::new().with_time_limit(Duration::from_secs(1));
//! let solution = Solver::new(model, params).solve()?;
//! println!("{:?} costs {}", solution.route, solution.cost);
//! # Ok::<(), gls::GlsError>(())
//! ```

mod candidates;
mod error;
pub mod model;
pub mod parameters;
mod search;
pub mod solver;

pub use error::{GlsError, GlsResult};
pub use model::{ArcCost, RoutingModel};
pub use parameters::{Metaheuristic, SearchParameters};
pub use solver::{SearchProgress, Solution, Solver};
