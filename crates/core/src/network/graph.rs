//! Planar road graph
//!
//! Vertices are road endpoints identified by their coordinates rounded to a
//! fixed number of decimals. Each road polyline becomes one undirected edge
//! traversable both ways. The graph is kept simple: a second road between
//! two vertices splits the longer of the two at its midpoint, and a loop
//! road is split at one and two thirds of its length.
//!
//! Query points are attached by splitting the nearest edge at the projected
//! point. Attachments are undone with [`RoadGraph::restore`] so that
//! successive queries see the same graph.

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::{
    node_hash, point_along, polyline_length, project_on_segment, split_polyline, vec2, EPSILON,
};
use geo::LineString;
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Default rounding of vertex coordinates (decimals)
pub const DEFAULT_PRECISION: usize = 6;

type IndexedSegment = GeomWithData<Line<[f64; 2]>, usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub from: usize,
    pub to: usize,
    /// Polyline from `from` to `to`
    pub geometry: Vec<Vec2>,
    pub length: f64,
    active: bool,
    /// Straight link from an attached query point to the road it snapped to
    connector: bool,
}

impl RoadEdge {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_connector(&self) -> bool {
        self.connector
    }

    /// The endpoint opposite to `node`
    #[inline]
    pub fn other(&self, node: usize) -> usize {
        if self.from == node {
            self.to
        } else {
            self.from
        }
    }

    /// Geometry oriented to start at `node`
    pub fn oriented_from(&self, node: usize) -> Vec<Vec2> {
        let mut g = self.geometry.clone();
        if self.from != node {
            g.reverse();
        }
        g
    }

    /// Dijkstra cost in micrometres
    #[inline]
    pub fn cost(&self) -> u64 {
        to_cost(self.length)
    }
}

/// Length in metres to an integer cost in micrometres
#[inline]
pub fn to_cost(length: f64) -> u64 {
    (length * 1e6).round().max(0.0) as u64
}

/// Undo point for temporary edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    nodes: usize,
    edges: usize,
    deactivated: usize,
}

#[derive(Debug, Clone)]
pub struct RoadGraph {
    precision: usize,
    nodes: Vec<Vec2>,
    node_index: FxHashMap<String, usize>,
    edges: Vec<RoadEdge>,
    adjacency: Vec<Vec<usize>>,
    deactivated: Vec<usize>,
    tree: RTree<IndexedSegment>,
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl RoadGraph {
    pub fn new(precision: usize) -> Self {
        Self {
            precision,
            nodes: Vec::new(),
            node_index: FxHashMap::default(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            deactivated: Vec::new(),
            tree: RTree::new(),
        }
    }

    /// Graph of a set of road polylines
    ///
    /// # Errors
    /// [`Error::InvalidInputs`] for a polyline with fewer than two points or
    /// non-finite coordinates.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a LineString<f64>>, precision: usize) -> Result<Self> {
        let mut graph = Self::new(precision);
        for line in lines {
            let points: Vec<Vec2> = line.coords().map(|c| vec2(*c)).collect();
            graph.add_road(&points)?;
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "road graph built"
        );
        Ok(graph)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of active edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.active).count()
    }

    #[inline]
    pub fn node(&self, id: usize) -> Vec2 {
        self.nodes[id]
    }

    #[inline]
    pub fn edge(&self, id: usize) -> &RoadEdge {
        &self.edges[id]
    }

    /// Active edges with their identifiers
    pub fn edges(&self) -> impl Iterator<Item = (usize, &RoadEdge)> + '_ {
        self.edges.iter().enumerate().filter(|(_, e)| e.active)
    }

    /// Vertex at `p`, if one exists at the graph precision
    pub fn find_node(&self, p: Vec2) -> Option<usize> {
        self.node_index.get(&node_hash(p, self.precision)).copied()
    }

    /// Active incident edges of `node` as (neighbour, edge id)
    pub fn neighbours(&self, node: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency[node]
            .iter()
            .filter(|&&e| self.edges[e].active)
            .map(move |&e| (self.edges[e].other(node), e))
    }

    /// Active edge of least length between `a` and `b`
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.neighbours(a)
            .filter(|&(n, _)| n == b)
            .map(|(_, e)| e)
            .min_by(|x, y| self.edges[*x].length.total_cmp(&self.edges[*y].length))
    }

    fn node_at(&mut self, p: Vec2) -> usize {
        let key = node_hash(p, self.precision);
        if let Some(&id) = self.node_index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(p);
        self.adjacency.push(Vec::new());
        self.node_index.insert(key, id);
        id
    }

    fn push_edge(&mut self, from: usize, to: usize, geometry: Vec<Vec2>) -> usize {
        self.push_typed_edge(from, to, geometry, false)
    }

    fn push_typed_edge(&mut self, from: usize, to: usize, mut geometry: Vec<Vec2>, connector: bool) -> usize {
        // snap the ends onto the vertices
        if let Some(first) = geometry.first_mut() {
            *first = self.nodes[from];
        }
        if let Some(last) = geometry.last_mut() {
            *last = self.nodes[to];
        }
        let id = self.edges.len();
        for w in geometry.windows(2) {
            self.tree.insert(GeomWithData::new(Line::new([w[0].x, w[0].y], [w[1].x, w[1].y]), id));
        }
        let length = polyline_length(&geometry);
        self.edges.push(RoadEdge {
            from,
            to,
            geometry,
            length,
            active: true,
            connector,
        });
        self.adjacency[from].push(id);
        if to != from {
            self.adjacency[to].push(id);
        }
        id
    }

    fn deactivate(&mut self, edge: usize) {
        self.edges[edge].active = false;
        self.deactivated.push(edge);
    }

    /// Split `edge` at curvilinear abscissa `s`, returning the new vertex
    fn split_edge(&mut self, edge: usize, s: f64) -> usize {
        let e = self.edges[edge].clone();
        let (head, tail) = split_polyline(&e.geometry, s);
        let (p, _) = point_along(&e.geometry, s);
        let mid = self.node_at(p);
        self.deactivate(edge);
        self.push_typed_edge(e.from, mid, head, e.connector);
        self.push_typed_edge(mid, e.to, tail, e.connector);
        mid
    }

    /// Insert a road polyline, keeping the graph simple
    ///
    /// # Errors
    /// [`Error::InvalidInputs`] for fewer than two points or non-finite
    /// coordinates.
    pub fn add_road(&mut self, points: &[Vec2]) -> Result<()> {
        if points.len() < 2 || points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(Error::invalid("a road needs at least two finite points"));
        }
        let length = polyline_length(points);
        if length < EPSILON {
            return Ok(());
        }
        let from = self.node_at(points[0]);
        let to = self.node_at(points[points.len() - 1]);

        if from == to {
            let (first, rest) = split_polyline(points, length / 3.0);
            let (second, third) = split_polyline(&rest, length / 3.0);
            let a = self.node_at(first[first.len() - 1]);
            let b = self.node_at(third[0]);
            self.push_edge(from, a, first);
            self.push_edge(a, b, second);
            self.push_edge(b, to, third);
            return Ok(());
        }

        match self.edge_between(from, to) {
            None => {
                self.push_edge(from, to, points.to_vec());
            }
            Some(existing) if self.edges[existing].length >= length => {
                let half = self.edges[existing].length / 2.0;
                self.split_edge(existing, half);
                self.push_edge(from, to, points.to_vec());
            }
            Some(_) => {
                let new = self.push_edge(from, to, points.to_vec());
                self.split_edge(new, length / 2.0);
            }
        }
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            deactivated: self.deactivated.len(),
        }
    }

    /// Undo every edit made since `checkpoint`
    ///
    /// Edges deactivated since the checkpoint come back to life; those created
    /// since are dropped along with their index entries.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        let kept = checkpoint.edges;
        for edge in self.deactivated.drain(checkpoint.deactivated..) {
            if edge < kept {
                self.edges[edge].active = true;
            }
        }
        for edge in kept..self.edges.len() {
            let g = self.edges[edge].geometry.clone();
            for w in g.windows(2) {
                self.tree
                    .remove(&GeomWithData::new(Line::new([w[0].x, w[0].y], [w[1].x, w[1].y]), edge));
            }
        }
        self.edges.truncate(kept);
        for p in self.nodes.drain(checkpoint.nodes..) {
            self.node_index.remove(&node_hash(p, self.precision));
        }
        self.adjacency.truncate(checkpoint.nodes);
        for list in &mut self.adjacency {
            list.retain(|&e| e < kept);
        }
    }

    /// Nearest active road edge to `p`: (edge, abscissa of the projection)
    ///
    /// Connectors of previously attached points are never candidates, so the
    /// snap of a point does not depend on what was attached before it.
    pub fn nearest_edge(&self, p: Vec2) -> Option<(usize, f64)> {
        let item = self
            .tree
            .nearest_neighbor_iter(&[p.x, p.y])
            .find(|item| {
                let e = &self.edges[item.data];
                e.active && !e.connector
            })?;
        let edge = &self.edges[item.data];
        let seg = item.geom();
        let (a, b) = (Vec2::new(seg.from[0], seg.from[1]), Vec2::new(seg.to[0], seg.to[1]));
        let mut s = 0.0;
        for w in edge.geometry.windows(2) {
            if (w[0] - a).norm() < EPSILON && (w[1] - b).norm() < EPSILON {
                break;
            }
            s += (w[1] - w[0]).norm();
        }
        let proj = project_on_segment(p, a, b);
        Some((item.data, s + proj.t * (b - a).norm()))
    }

    /// Connect `q` to the graph, returning its vertex
    ///
    /// The nearest edge is split at the projection of `q` and a straight
    /// connector joins `q` to the split point.
    ///
    /// # Errors
    /// [`Error::InvalidInputs`] for a non-finite point or an empty graph.
    pub fn attach(&mut self, q: Vec2) -> Result<usize> {
        if !(q.x.is_finite() && q.y.is_finite()) {
            return Err(Error::invalid("query point is not finite"));
        }
        if let Some(id) = self.find_node(q) {
            return Ok(id);
        }
        let (edge, s) = self
            .nearest_edge(q)
            .ok_or_else(|| Error::invalid("cannot attach a point to an empty road graph"))?;
        let e = &self.edges[edge];
        let anchor = if s <= EPSILON {
            e.from
        } else if s >= e.length - EPSILON {
            e.to
        } else {
            self.split_edge(edge, s)
        };
        if (self.nodes[anchor] - q).norm() < EPSILON {
            return Ok(anchor);
        }
        let id = self.node_at(q);
        if id != anchor {
            let anchor_point = self.nodes[anchor];
            self.push_typed_edge(id, anchor, vec![q, anchor_point], true);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn road(points: &[(f64, f64)]) -> Vec<Vec2> {
        points.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
    }

    #[test]
    fn test_shared_endpoints_merge() {
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (10.0, 0.0)])).unwrap();
        g.add_road(&road(&[(10.0, 0.0), (10.0, 10.0)])).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_multi_edge_splits_longer() {
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (10.0, 0.0)])).unwrap();
        g.add_road(&road(&[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)])).unwrap();
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.node_count(), 3);
        let a = g.find_node(Vec2::zeros()).unwrap();
        let b = g.find_node(Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(g.neighbours(a).filter(|&(n, _)| n == b).count(), 1);
        let mid = g.find_node(Vec2::new(5.0, 5.0)).unwrap();
        assert_eq!(g.neighbours(mid).count(), 2);
    }

    #[test]
    fn test_self_loop_in_thirds() {
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0), (0.0, 0.0)]))
            .unwrap();
        assert_eq!(g.edge_count(), 3);
        for (_, e) in g.edges() {
            assert_abs_diff_eq!(e.length, 4.0, epsilon = 1e-9);
            assert_ne!(e.from, e.to);
        }
    }

    #[test]
    fn test_attach_and_restore() {
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (10.0, 0.0)])).unwrap();
        let before = g.checkpoint();
        let q = g.attach(Vec2::new(4.0, 3.0)).unwrap();
        assert_eq!(g.edge_count(), 3);
        let split = g.find_node(Vec2::new(4.0, 0.0)).unwrap();
        assert!(g.edge_between(q, split).is_some());
        g.restore(before);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.find_node(Vec2::new(4.0, 0.0)).is_none());
        let (edge, s) = g.nearest_edge(Vec2::new(7.0, 1.0)).unwrap();
        assert_eq!(edge, 0);
        assert_abs_diff_eq!(s, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_second_attach_ignores_first_connector() {
        // b lies closer to a's connector than to the road
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (100.0, 0.0)])).unwrap();
        let before = g.checkpoint();
        g.attach(Vec2::new(10.0, 10.0)).unwrap();
        let b = g.attach(Vec2::new(10.5, 9.0)).unwrap();
        let foot = g.find_node(Vec2::new(10.5, 0.0)).unwrap();
        let link = g.edge_between(b, foot).unwrap();
        assert!(g.edge(link).is_connector());
        assert_abs_diff_eq!(g.edge(link).length, 9.0, epsilon = 1e-12);

        g.restore(before);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edge(0).is_active());
    }

    #[test]
    fn test_restore_after_splitting_new_edges() {
        let mut g = RoadGraph::default();
        g.add_road(&road(&[(0.0, 0.0), (100.0, 0.0)])).unwrap();
        let before = g.checkpoint();
        // the second and third attachments split pieces created by the first
        for x in [40.0, 20.0, 60.0, 30.0] {
            g.attach(Vec2::new(x, 5.0)).unwrap();
        }
        g.restore(before);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
        let (edge, s) = g.nearest_edge(Vec2::new(25.0, 3.0)).unwrap();
        assert_eq!(edge, 0);
        assert_abs_diff_eq!(s, 25.0, epsilon = 1e-12);
    }
}
