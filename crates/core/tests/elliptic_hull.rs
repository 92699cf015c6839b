//! Minimum-area bounding ellipse soundness

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use geo::{Area, ConvexHull, LineString, Polygon, Rotate, Translate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use urban_comfort_core::geometry::elliptic_hull::hull_perimeter;
use urban_comfort_core::geometry::{elliptic_hull, MabeConfig, MabeMethod, MabeObjective};
use urban_comfort_core::Vec2;

fn polygon_from(points: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(points.to_vec()), vec![])
}

fn random_polygon(rng: &mut StdRng) -> Polygon<f64> {
    let n = rng.random_range(5..12);
    let (a, b) = (rng.random_range(5.0..50.0), rng.random_range(5.0..50.0));
    let mut angles: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..2.0 * PI)).collect();
    angles.sort_by(f64::total_cmp);
    let points: Vec<(f64, f64)> = angles
        .iter()
        .map(|t| {
            let shrink = rng.random_range(0.8..1.0);
            (100.0 + shrink * a * t.cos(), -40.0 + shrink * b * t.sin())
        })
        .collect();
    polygon_from(&points).convex_hull()
}

#[test]
fn test_random_polygons_are_enclosed() {
    let mut rng = StdRng::seed_from_u64(42);
    let config = MabeConfig::default();
    for _ in 0..40 {
        let polygon = random_polygon(&mut rng);
        if polygon.unsigned_area() < 1.0 {
            continue;
        }
        let hull = elliptic_hull(&polygon, &config).unwrap();
        for c in polygon.exterior().coords() {
            assert!(hull.contains(Vec2::new(c.x, c.y), 1e-6), "{c:?} outside {hull:?}");
        }
        assert!(hull.area >= polygon.unsigned_area() - 1e-9);
        assert!(hull.perimeter >= hull_perimeter(&polygon) - 1e-9);
        assert!(hull.semi_major >= hull.semi_minor);
        assert!((0.0..PI).contains(&hull.azimuth));
    }
}

#[test]
fn test_rotated_rectangle() {
    let rectangle = polygon_from(&[(0.0, 0.0), (8.0, 0.0), (8.0, 2.0), (0.0, 2.0)]);
    let rotated = rectangle.rotate_around_point(30.0, geo::Point::new(0.0, 0.0));
    let hull = elliptic_hull(&rotated, &MabeConfig::default()).unwrap();
    assert_eq!(hull.method, MabeMethod::Parall);
    assert_abs_diff_eq!(hull.semi_major, 8.0 / 2f64.sqrt(), epsilon = 1e-9);
    assert_abs_diff_eq!(hull.semi_minor, 2.0 / 2f64.sqrt(), epsilon = 1e-9);
    assert_abs_diff_eq!(hull.azimuth, 30f64.to_radians(), epsilon = 1e-9);
    assert_abs_diff_eq!(hull.area, PI * 8.0 * 2.0 / 2.0, epsilon = 1e-9);
}

#[test]
fn test_regular_hexagon_gives_circumcircle() {
    let r = 10.0;
    let points: Vec<(f64, f64)> = (0..6)
        .map(|k| {
            let t = PI / 3.0 * f64::from(k);
            (r * t.cos(), r * t.sin())
        })
        .collect();
    let hull = elliptic_hull(&polygon_from(&points), &MabeConfig::default()).unwrap();
    assert_relative_eq!(hull.area, PI * r * r, max_relative = 1e-6);
    assert_relative_eq!(hull.semi_major, hull.semi_minor, max_relative = 1e-6);
}

#[test]
fn test_translation_and_scale() {
    let mut rng = StdRng::seed_from_u64(3);
    let config = MabeConfig::default();
    for _ in 0..10 {
        let polygon = random_polygon(&mut rng);
        let base = elliptic_hull(&polygon, &config).unwrap();
        let moved = elliptic_hull(&polygon.translate(-250.0, 75.0), &config).unwrap();
        assert_relative_eq!(moved.area, base.area, max_relative = 1e-6);
        assert_abs_diff_eq!(moved.center.x, base.center.x - 250.0, epsilon = 1e-6);

        let doubled = Polygon::new(
            LineString::from(
                polygon
                    .exterior()
                    .coords()
                    .map(|c| (2.0 * c.x, 2.0 * c.y))
                    .collect::<Vec<_>>(),
            ),
            vec![],
        );
        let scaled = elliptic_hull(&doubled, &config).unwrap();
        assert_relative_eq!(scaled.area, 4.0 * base.area, max_relative = 1e-6);
    }
}

#[test]
fn test_perimeter_objective_encloses() {
    let config = MabeConfig {
        objective: MabeObjective::Perimeter,
        ..MabeConfig::default()
    };
    let kite = polygon_from(&[(0.0, 0.0), (3.0, -1.0), (5.0, 0.0), (3.0, 2.0)]);
    let hull = elliptic_hull(&kite, &config).unwrap();
    for c in kite.exterior().coords() {
        assert!(hull.contains(Vec2::new(c.x, c.y), 1e-6));
    }
    let by_area = elliptic_hull(&kite, &MabeConfig::default()).unwrap();
    assert!(hull.perimeter <= by_area.perimeter + 1e-9);
}

#[test]
fn test_degenerate_polygon_is_rejected() {
    let segment = polygon_from(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
    assert!(elliptic_hull(&segment, &MabeConfig::default()).is_err());
}
