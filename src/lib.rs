//! Bounding volume hierarchy ray queries for a production path tracer.
//!
//! Geometry is registered with a [`SceneBuilder`], which packs it into an immutable
//! [`SceneBuffer`]. The buffer answers closest hit, shadow, transparent shadow, local
//! (single object) and volume queries, and can be shared between threads.

pub mod geometry;
pub mod kernel;
pub mod scene;
mod util;

pub use geometry::{Ray, SelfToken};
pub use kernel::{Intersection, LocalIntersection, ShadowAllResult};
pub use scene::{
    BuildSettings, Geometry, ObjectDesc, Placement, PrimitiveDesc, SceneBuffer, SceneBuilder,
    SceneError, Visibility,
};
pub use util::Stats;
