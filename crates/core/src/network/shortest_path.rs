//! Shortest road path between two arbitrary points

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::coord;
use crate::network::graph::RoadGraph;
use geo::{LineString, MultiLineString};
use pathfinding::prelude::dijkstra;

#[derive(Debug, Clone, PartialEq)]
pub struct RoadPath {
    /// Path length including the connectors to the query points (m)
    pub length: f64,
    /// One line per traversed edge, oriented from source to target
    pub geometry: MultiLineString<f64>,
}

impl RoadPath {
    fn empty() -> Self {
        Self {
            length: 0.0,
            geometry: MultiLineString::new(Vec::new()),
        }
    }
}

/// Shortest path between vertices, Dijkstra on micrometre costs
pub(crate) fn vertex_path(graph: &RoadGraph, from: usize, to: usize) -> Result<RoadPath> {
    if from == to {
        return Ok(RoadPath::empty());
    }
    let (nodes, _) = dijkstra(
        &from,
        |&n| {
            graph
                .neighbours(n)
                .map(|(m, e)| (m, graph.edge(e).cost()))
                .collect::<Vec<_>>()
        },
        |&n| n == to,
    )
    .ok_or(Error::NoPath)?;

    let mut length = 0.0;
    let mut lines = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let edge = graph.edge_between(pair[0], pair[1]).ok_or(Error::NoPath)?;
        let e = graph.edge(edge);
        length += e.length;
        lines.push(LineString::from(
            e.oriented_from(pair[0]).into_iter().map(coord).collect::<Vec<_>>(),
        ));
    }
    Ok(RoadPath {
        length,
        geometry: MultiLineString::new(lines),
    })
}

/// Shortest path along the roads from `a` to `b`
///
/// Both points are attached to their nearest road; the graph is restored
/// before returning. Identical points give an empty path of length 0.
///
/// # Errors
/// [`Error::NoPath`] when the points lie on disconnected components,
/// [`Error::InvalidInputs`] for non-finite points or an empty graph.
pub fn shortest_path(graph: &mut RoadGraph, a: Vec2, b: Vec2) -> Result<RoadPath> {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return Err(Error::invalid("path endpoints must be finite"));
    }
    let checkpoint = graph.checkpoint();
    let result = graph
        .attach(a)
        .and_then(|from| Ok((from, graph.attach(b)?)))
        .and_then(|(from, to)| vertex_path(graph, from, to));
    graph.restore(checkpoint);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid() -> RoadGraph {
        let mut g = RoadGraph::default();
        for k in 0..3 {
            for j in 0..2 {
                let (c, s0, s1) = (f64::from(k) * 10.0, f64::from(j) * 10.0, f64::from(j + 1) * 10.0);
                g.add_road(&[Vec2::new(s0, c), Vec2::new(s1, c)]).unwrap();
                g.add_road(&[Vec2::new(c, s0), Vec2::new(c, s1)]).unwrap();
            }
        }
        g
    }

    #[test]
    fn test_same_point_is_empty() {
        let mut g = grid();
        let p = shortest_path(&mut g, Vec2::new(3.0, 1.0), Vec2::new(3.0, 1.0)).unwrap();
        assert_eq!(p.length, 0.0);
        assert!(p.geometry.0.is_empty());
    }

    #[test]
    fn test_path_along_grid() {
        let mut g = RoadGraph::default();
        g.add_road(&[Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0)]).unwrap();
        g.add_road(&[Vec2::new(20.0, 0.0), Vec2::new(20.0, 20.0)]).unwrap();
        let p = shortest_path(&mut g, Vec2::new(5.0, 2.0), Vec2::new(22.0, 15.0)).unwrap();
        // connectors 2 and 2, roads 15 and 15
        assert_abs_diff_eq!(p.length, 34.0, epsilon = 1e-9);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_disconnected_is_no_path() {
        let mut g = RoadGraph::default();
        g.add_road(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]).unwrap();
        g.add_road(&[Vec2::new(0.0, 50.0), Vec2::new(10.0, 50.0)]).unwrap();
        assert_eq!(
            shortest_path(&mut g, Vec2::new(1.0, 1.0), Vec2::new(1.0, 49.0)),
            Err(Error::NoPath)
        );
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_symmetric_on_grid() {
        let mut g = grid();
        let (a, b) = (Vec2::new(2.0, 3.0), Vec2::new(17.0, 14.0));
        let ab = shortest_path(&mut g, a, b).unwrap().length;
        let ba = shortest_path(&mut g, b, a).unwrap().length;
        assert_abs_diff_eq!(ab, ba, epsilon = 1e-9);
    }
}
