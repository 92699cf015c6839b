//! Urban morphology: building index, ray casting, isovists, star kernels,
//! elliptic hulls and crossroad descriptors

pub mod buildings;
pub mod crossroad;
pub mod elliptic_hull;
pub mod isovist;
pub mod primitives;
pub mod raycast;
pub mod star_kernel;

pub use buildings::{Building, BuildingIndex};
pub use crossroad::{CrossroadSequence, Item};
pub use elliptic_hull::{elliptic_hull, EllipticHull, MabeConfig, MabeMethod, MabeObjective};
pub use isovist::{isovist, Isovist, IsovistConfig, IsovistMetrics, IsovistNode, NodeKind};
pub use raycast::{cast_2_5d, cast_2d, cast_many, panoptic_cast, panoptic_directions, Ray, RayCastConfig, RayStatistics};
pub use star_kernel::{star_kernel, StarKernel, StarKernelConfig};
