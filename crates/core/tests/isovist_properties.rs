//! Isovist, ray casting and star kernel properties on synthetic scenes

mod common;

use approx::assert_abs_diff_eq;
use common::{block, city_blocks};
use geo::{Area, LineString, Polygon};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use urban_comfort_core::geometry::{
    cast_2d, isovist, panoptic_directions, star_kernel, Building, BuildingIndex, IsovistConfig,
    StarKernelConfig,
};
use urban_comfort_core::{Error, Vec2};

/// Street viewpoints of a 4×4 grid of 20 m blocks with 10 m streets
fn street_viewpoints(rng: &mut StdRng, n: usize) -> Vec<Vec2> {
    (0..n)
        .map(|k| {
            let along = rng.random_range(1.0..109.0);
            let street = 25.0 + 30.0 * f64::from(rng.random_range(0..3u8));
            if k % 2 == 0 {
                Vec2::new(street, along)
            } else {
                Vec2::new(along, street)
            }
        })
        .collect()
}

#[test]
fn test_empty_scene_is_a_full_disk() {
    let index = BuildingIndex::new(Vec::new());
    for radius in [10.0, 100.0, 250.0] {
        let config = IsovistConfig {
            max_radius: radius,
            ..IsovistConfig::default()
        };
        let iso = isovist(&index, Vec2::new(3.0, -7.0), &config).unwrap();
        assert_abs_diff_eq!(iso.metrics.perimeter, 2.0 * PI * radius, epsilon = 1e-9);
        assert_abs_diff_eq!(iso.metrics.skyline_ratio, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iso.metrics.drift, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_enclosing_courtyard_is_fully_material() {
    let courtyard = Building::new(
        Polygon::new(
            LineString::from(vec![(-80.0, -80.0), (80.0, -80.0), (80.0, 80.0), (-80.0, 80.0)]),
            vec![LineString::from(vec![(-10.0, -15.0), (-10.0, 15.0), (10.0, 15.0), (10.0, -15.0)])],
        ),
        15.0,
    )
    .unwrap();
    let index = BuildingIndex::new(vec![courtyard]);
    let iso = isovist(&index, Vec2::new(-4.0, 6.0), &IsovistConfig::default()).unwrap();
    assert_abs_diff_eq!(iso.metrics.perimeter, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(iso.metrics.solid, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(iso.metrics.skyline_ratio, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(iso.metrics.area, 600.0, epsilon = 1e-9);
}

#[test]
fn test_decomposition_on_street_grid() {
    let index = BuildingIndex::new(city_blocks(4, 20.0, 10.0, 15.0));
    let mut rng = StdRng::seed_from_u64(7);
    let config = IsovistConfig::default();
    for vp in street_viewpoints(&mut rng, 24) {
        let iso = isovist(&index, vp, &config).unwrap();
        let m = iso.metrics;
        assert_abs_diff_eq!(m.perimeter, m.solid + m.occlusiv + m.skyline, epsilon = 1e-9);
        assert_abs_diff_eq!(
            m.solid_ratio + m.occlusiv_ratio + m.skyline_ratio,
            1.0,
            epsilon = 1e-6
        );
        assert!(m.area <= PI * config.max_radius.powi(2) + 1e-6);
        assert!(m.min_radius <= m.max_radius && m.max_radius <= config.max_radius + 1e-9);
        // arcs are sampled by chords
        assert!(iso.polygon.unsigned_area() <= m.area + 1e-6);
    }
}

#[test]
fn test_rays_end_on_the_isovist_boundary() {
    let index = BuildingIndex::new(city_blocks(4, 20.0, 10.0, 15.0));
    let mut rng = StdRng::seed_from_u64(11);
    let config = IsovistConfig::default();
    for vp in street_viewpoints(&mut rng, 10) {
        let m = isovist(&index, vp, &config).unwrap().metrics;
        for direction in panoptic_directions(36) {
            let ray = cast_2d(&index, vp, direction, config.max_radius).unwrap();
            assert!(ray.distance >= m.min_radius - 1e-9);
            assert!(ray.distance <= m.max_radius + 1e-9);
        }
    }
}

#[test]
fn test_indoor_viewpoint_is_rejected() {
    let index = BuildingIndex::new(vec![block(0.0, 0.0, 20.0, 20.0, 10.0)]);
    assert!(matches!(
        isovist(&index, Vec2::new(10.0, 10.0), &IsovistConfig::default()),
        Err(Error::IndoorViewpoint { .. })
    ));
}

#[test]
fn test_star_kernel_within_open_space() {
    let index = BuildingIndex::new(city_blocks(4, 20.0, 10.0, 15.0));
    let config = StarKernelConfig::default();
    // street crossings
    for vp in [Vec2::new(25.0, 25.0), Vec2::new(55.0, 85.0), Vec2::new(85.0, 55.0)] {
        let result = star_kernel(&index, vp, &config).unwrap();
        assert!(result.radius >= 5.0 * 2f64.sqrt() - 1e-6);
        if let (Some(kernel), Some(space)) = (&result.kernel, &result.open_space) {
            assert!(kernel.unsigned_area() <= space.unsigned_area() + 1e-9);
            assert_abs_diff_eq!(kernel.unsigned_area(), result.area, epsilon = 1e-9);
        }
    }
}
