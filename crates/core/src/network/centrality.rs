//! Vertex centralities of the road graph
//!
//! Distances are edge lengths. Single-source searches run in parallel over
//! the vertices with rayon.
//!
//! # References
//! - Brandes, U. (2001). "A faster algorithm for betweenness centrality".
//!   Journal of Mathematical Sociology, 25(2), 163-177

use crate::network::graph::RoadGraph;
use crate::network::neighbourhood::vertex_distances;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Number of active edges incident to each vertex
pub fn degree(graph: &RoadGraph) -> Vec<usize> {
    (0..graph.node_count())
        .map(|n| graph.neighbours(n).count())
        .collect()
}

/// Closeness r / Σd over the r vertices reachable from each vertex
///
/// Isolated vertices get 0.
pub fn closeness(graph: &RoadGraph) -> Vec<f64> {
    (0..graph.node_count())
        .into_par_iter()
        .map(|n| {
            let dist = vertex_distances(graph, n);
            let (reached, total) = dist
                .iter()
                .enumerate()
                .filter(|&(m, d)| m != n && d.is_finite())
                .fold((0usize, 0.0), |(r, t), (_, d)| (r + 1, t + d));
            if total > 0.0 {
                reached as f64 / total
            } else {
                0.0
            }
        })
        .collect()
}

/// Dependencies accumulated from one source (Brandes)
fn source_dependencies(graph: &RoadGraph, source: usize) -> Vec<f64> {
    let n = graph.node_count();
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![u64::MAX; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut stack = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    sigma[source] = 1.0;
    dist[source] = 0;
    heap.push(Reverse((0u64, source)));
    while let Some(Reverse((d, v))) = heap.pop() {
        if d > dist[v] {
            continue;
        }
        stack.push(v);
        for (w, e) in graph.neighbours(v) {
            let alt = d + graph.edge(e).cost();
            if alt < dist[w] {
                dist[w] = alt;
                sigma[w] = sigma[v];
                preds[w].clear();
                preds[w].push(v);
                heap.push(Reverse((alt, w)));
            } else if alt == dist[w] {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    let mut out = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        for &v in &preds[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            out[w] = delta[w];
        }
    }
    out
}

/// Weighted betweenness of every vertex
///
/// Each unordered pair is counted once. With `normalized`, values are
/// divided by (n − 1)(n − 2)/2.
pub fn betweenness(graph: &RoadGraph, normalized: bool) -> Vec<f64> {
    let n = graph.node_count();
    let mut scores = (0..n)
        .into_par_iter()
        .map(|s| source_dependencies(graph, s))
        .reduce(
            || vec![0.0; n],
            |mut acc, part| {
                acc.iter_mut().zip(part).for_each(|(a, p)| *a += p);
                acc
            },
        );
    let scale = if normalized && n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.5
    };
    scores.iter_mut().for_each(|s| *s *= scale);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::vec2::Vec2;
    use approx::assert_abs_diff_eq;

    fn path_graph() -> RoadGraph {
        let mut g = RoadGraph::default();
        for k in 0..3 {
            let x = f64::from(k) * 10.0;
            g.add_road(&[Vec2::new(x, 0.0), Vec2::new(x + 10.0, 0.0)]).unwrap();
        }
        g
    }

    #[test]
    fn test_degree() {
        let g = path_graph();
        let mut d = degree(&g);
        d.sort_unstable();
        assert_eq!(d, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_betweenness_on_path() {
        let g = path_graph();
        let b = betweenness(&g, false);
        let inner = g.find_node(Vec2::new(10.0, 0.0)).unwrap();
        let end = g.find_node(Vec2::new(0.0, 0.0)).unwrap();
        // pairs (0,2), (0,3) pass through x = 10
        assert_abs_diff_eq!(b[inner], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b[end], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closeness_on_path() {
        let g = path_graph();
        let c = closeness(&g);
        let end = g.find_node(Vec2::new(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(c[end], 3.0 / 60.0, epsilon = 1e-12);
    }
}
