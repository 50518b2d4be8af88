//! gt-sampled: tabular (sampled) compressor/pump model in 3-D.
//!
//! An alternative to the physics-based train solvers: a table of sampled
//! (rate, suction pressure, discharge pressure) -> power-or-fuel points is
//! interpolated linearly inside its convex hull; queries outside the hull are
//! projected onto it the way ASV recirculation and pressure choking move the
//! real operating point.
//!
//! The computational-geometry primitives (2-D/3-D convex hulls, Delaunay
//! triangulation, simplex interpolation) are implemented natively; the data
//! sets in this domain are small enough that no external geometry library is
//! needed.

pub mod delaunay;
pub mod engine;
pub mod error;
pub mod hull2d;
pub mod hull3d;
pub mod interpolate;

// Re-exports for ergonomics
pub use delaunay::Delaunay3;
pub use engine::{CompressorModelSampled3D, SampledDataPoint};
pub use error::{SampledError, SampledResult};
pub use hull3d::{ConvexHull3, Facet, HalfHull, HalfSide};
pub use interpolate::SimplexInterpolator2;
