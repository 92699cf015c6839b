//! Road neighbourhood within a network distance of a point
//!
//! Every point of an edge is reached through one of its two ends, so the
//! part of edge (u, v) within distance D of the source is the union of the
//! prefix of length D − d(u) from u and the suffix of length D − d(v) from
//! v. When both overlap, the edge is cut where the two approaches meet.

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::{coord, polyline_length, split_polyline, truncate_polyline};
use crate::network::graph::RoadGraph;
use geo::{LineString, MultiLineString};
use pathfinding::prelude::dijkstra_all;

/// Reached part of one edge
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourhoodPiece {
    /// Polyline oriented away from the source
    pub geometry: Vec<Vec2>,
    /// Network distance from the source to the first point
    pub start_distance: f64,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbourhood {
    pub pieces: Vec<NeighbourhoodPiece>,
    pub total_length: f64,
}

impl Neighbourhood {
    pub fn to_multilinestring(&self) -> MultiLineString<f64> {
        MultiLineString::new(
            self.pieces
                .iter()
                .map(|p| LineString::from(p.geometry.iter().copied().map(coord).collect::<Vec<_>>()))
                .collect(),
        )
    }
}

/// Exact network distance of every vertex reachable from `source`
pub(crate) fn vertex_distances(graph: &RoadGraph, source: usize) -> Vec<f64> {
    let parents = dijkstra_all(&source, |&n| {
        graph
            .neighbours(n)
            .map(|(m, e)| (m, graph.edge(e).cost()))
            .collect::<Vec<_>>()
    });
    let mut order: Vec<(usize, usize, u64)> = parents.iter().map(|(&n, &(p, c))| (n, p, c)).collect();
    order.sort_by_key(|&(_, _, c)| c);

    let mut dist = vec![f64::INFINITY; graph.node_count()];
    dist[source] = 0.0;
    for (n, parent, _) in order {
        let step = graph
            .edge_between(parent, n)
            .map_or(f64::INFINITY, |e| graph.edge(e).length);
        dist[n] = dist[parent] + step;
    }
    dist
}

fn reversed(mut points: Vec<Vec2>) -> Vec<Vec2> {
    points.reverse();
    points
}

/// Parts of the road network within `max_distance` of `source`
///
/// # Errors
/// [`Error::InvalidInputs`] for a negative or non-finite distance, a
/// non-finite source or an empty graph.
pub fn neighbourhood(graph: &mut RoadGraph, source: Vec2, max_distance: f64) -> Result<Neighbourhood> {
    if !(max_distance.is_finite() && max_distance >= 0.0) {
        return Err(Error::invalid("neighbourhood distance must be finite and non-negative"));
    }
    let checkpoint = graph.checkpoint();
    let result = graph.attach(source).map(|s| collect(graph, s, max_distance));
    graph.restore(checkpoint);
    result
}

fn collect(graph: &RoadGraph, source: usize, max_distance: f64) -> Neighbourhood {
    let dist = vertex_distances(graph, source);
    let mut pieces = Vec::new();
    let mut push = |geometry: Vec<Vec2>, start_distance: f64| {
        let length = polyline_length(&geometry);
        if length > 1e-9 {
            pieces.push(NeighbourhoodPiece {
                geometry,
                start_distance,
                length,
            });
        }
    };

    for (_, e) in graph.edges() {
        let (du, dv) = (dist[e.from], dist[e.to]);
        let reach = |d: f64| {
            if d <= max_distance {
                (max_distance - d).min(e.length)
            } else {
                0.0
            }
        };
        let (lu, lv) = (reach(du), reach(dv));
        if lu + lv >= e.length - 1e-9 {
            // covered from both sides: cut where the approaches meet
            let meet = if dv.is_finite() && du.is_finite() {
                ((dv + e.length - du) / 2.0).clamp(0.0, e.length)
            } else if du.is_finite() {
                e.length
            } else {
                0.0
            };
            let (head, tail) = split_polyline(&e.geometry, meet);
            if meet > 0.0 {
                push(head, du);
            }
            if meet < e.length {
                push(reversed(tail), dv);
            }
        } else {
            if lu > 0.0 {
                push(truncate_polyline(&e.geometry, lu), du);
            }
            if lv > 0.0 {
                let from_v = e.oriented_from(e.to);
                push(truncate_polyline(&from_v, lv), dv);
            }
        }
    }

    let total_length = pieces.iter().map(|p| p.length).sum();
    Neighbourhood {
        pieces,
        total_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_straight_road() {
        let mut g = RoadGraph::default();
        g.add_road(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)]).unwrap();
        let n = neighbourhood(&mut g, Vec2::new(50.0, 0.0), 20.0).unwrap();
        assert_abs_diff_eq!(n.total_length, 40.0, epsilon = 1e-9);
        assert_eq!(n.pieces.len(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_cycle_is_cut_where_fronts_meet() {
        let mut g = RoadGraph::default();
        let corners = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        for k in 0..4 {
            let (a, b) = (corners[k], corners[(k + 1) % 4]);
            g.add_road(&[Vec2::new(a.0, a.1), Vec2::new(b.0, b.1)]).unwrap();
        }
        let n = neighbourhood(&mut g, Vec2::new(5.0, 0.0), 100.0).unwrap();
        assert_abs_diff_eq!(n.total_length, 40.0, epsilon = 1e-9);
        for piece in &n.pieces {
            assert!(piece.start_distance + piece.length <= 20.0 + 1e-9);
        }
    }

    #[test]
    fn test_zero_distance() {
        let mut g = RoadGraph::default();
        g.add_road(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]).unwrap();
        let n = neighbourhood(&mut g, Vec2::new(3.0, 0.0), 0.0).unwrap();
        assert!(n.pieces.is_empty());
    }
}
