pub mod complex;
pub mod grid;
pub mod ols;
pub mod spline;

pub use complex::{coth, diffusive};
pub use grid::{lin_space, log_space};
pub use ols::{WeightedFit, solve_least_squares, weighted_least_squares};
pub use spline::{CubicSpline, SplineBoundary};
