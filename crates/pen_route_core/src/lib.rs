//! Pen-plotter route optimization: orders and orients a set of line paths so
//! the pen travels as little as possible while lifted.
//!
//! A [`PathGraph`] models every path in both directions, [`GreedyRouter`]
//! builds a nearest-neighbour tour through a [`SpatialIndex`], and
//! [`RouteOptimizer`] refines it with guided local search under a time
//! budget. [`route`] turns tours back into oriented paths, validates them and
//! merges touching ones.

mod error;
pub mod geometry;
pub mod graph;
pub mod greedy;
pub mod io;
pub mod logging;
pub mod optimizer;
pub mod pipeline;
pub mod route;
pub mod spatial;

pub use error::{Error, Result};
pub use geometry::{Point, Polyline};
pub use graph::{NodeId, Orientation, PathGraph};
pub use greedy::GreedyRouter;
pub use io::options::{LogFormat, LogLevel, RouterOptions};
pub use optimizer::{COST_MULTIPLIER, OptimizedTour, RouteOptimizer};
pub use pipeline::RouteReport;
pub use spatial::SpatialIndex;
