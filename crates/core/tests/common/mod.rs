//! Shared fixtures of the integration tests
#![allow(dead_code)]

use geo::polygon;
use urban_comfort_core::geometry::Building;

/// Log to the test writer, filtered by `RUST_LOG`
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Axis-aligned rectangular building
pub fn block(x0: f64, y0: f64, x1: f64, y1: f64, height: f64) -> Building {
    Building::new(
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
        height,
    )
    .unwrap()
}

/// Regular grid of square blocks separated by streets
pub fn city_blocks(n: usize, size: f64, street: f64, height: f64) -> Vec<Building> {
    let pitch = size + street;
    let mut out = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f64 * pitch, j as f64 * pitch);
            out.push(block(x, y, x + size, y + size, height));
        }
    }
    out
}
