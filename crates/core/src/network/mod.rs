//! Road network: planar graph, shortest paths, neighbourhoods, centralities

pub mod centrality;
pub mod graph;
pub mod neighbourhood;
pub mod shortest_path;

pub use centrality::{betweenness, closeness, degree};
pub use graph::{Checkpoint, RoadEdge, RoadGraph};
pub use neighbourhood::{neighbourhood, Neighbourhood, NeighbourhoodPiece};
pub use shortest_path::{shortest_path, RoadPath};
