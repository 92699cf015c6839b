//! Crossroad sequence algebra and enumeration

mod common;

use approx::assert_relative_eq;
use geo::Area;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use urban_comfort_core::geometry::crossroad::enumerate;
use urban_comfort_core::geometry::{CrossroadSequence, Item};

fn random_sequence(rng: &mut StdRng, n: usize) -> CrossroadSequence {
    let mut items: Vec<Item> = (0..n)
        .filter(|_| rng.random_bool(0.4))
        .map(Item::Branch)
        .collect();
    if rng.random_bool(0.5) {
        let i = rng.random_range(0..n);
        let j = (i + rng.random_range(1..n)) % n;
        items.push(Item::Sector(i, j));
    }
    if items.is_empty() {
        items.push(Item::Branch(0));
    }
    CrossroadSequence::new(n, items).unwrap()
}

#[test]
fn test_rotation_and_mirror_algebra() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let n = [4, 6, 8, 12][rng.random_range(0..4)];
        let seq = random_sequence(&mut rng, n);
        let k = rng.random_range(0..n);
        assert_eq!(seq.rotate(k).rotate(n - k).items(), seq.items());
        assert_eq!(seq.rotate(k), seq);
        assert_eq!(seq.mirror().mirror().items(), seq.items());
        assert!(seq.mirror().is_equivalent(&seq, true));
        assert_eq!(seq.rotate(k).canonical(true), seq.mirror().canonical(true));
    }
}

#[test]
fn test_minimum_model() {
    assert_eq!(CrossroadSequence::branches(8, &[0, 2, 4]).unwrap().minimum_model(), 4);
    assert_eq!(CrossroadSequence::branches(12, &[0, 3, 6, 9]).unwrap().minimum_model(), 4);
    assert_eq!(CrossroadSequence::branches(16, &[0, 6]).unwrap().minimum_model(), 8);
    assert_eq!(CrossroadSequence::branches(12, &[0, 1]).unwrap().minimum_model(), 12);
}

#[test]
fn test_branch_only_counts_are_necklaces() {
    let count = |n: usize, mirror: bool| {
        enumerate(n, mirror)
            .unwrap()
            .iter()
            .filter(|s| s.items().iter().all(|i| matches!(i, Item::Branch(_))))
            .count()
    };
    // necklaces and bracelets of n binary beads, empty one excluded
    assert_eq!(count(5, false), 7);
    assert_eq!(count(6, false), 13);
    assert_eq!(count(6, true), 12);
    assert_eq!(count(8, false), 35);
    assert_eq!(count(8, true), 29);
}

#[test]
fn test_enumeration_has_no_duplicates() {
    for mirror in [false, true] {
        let all = enumerate(8, mirror).unwrap();
        for (a, sa) in all.iter().enumerate() {
            for sb in &all[a + 1..] {
                assert!(!sa.is_equivalent(sb, mirror), "{sa} ~ {sb}");
            }
        }
    }
}

#[test]
fn test_footprint_is_invariant_under_symmetries() {
    let seq = CrossroadSequence::new(8, [Item::Branch(1), Item::Branch(4), Item::Sector(5, 7)]).unwrap();
    let area = seq.to_polygon(30.0, 3.0).unwrap().unsigned_area();
    for other in [seq.rotate(2), seq.rotate(5), seq.mirror()] {
        let a = other.to_polygon(30.0, 3.0).unwrap().unsigned_area();
        assert_relative_eq!(a, area, max_relative = 1e-6);
    }
    let more = CrossroadSequence::new(8, [Item::Branch(1), Item::Branch(2), Item::Branch(4), Item::Sector(5, 7)])
        .unwrap()
        .to_polygon(30.0, 3.0)
        .unwrap()
        .unsigned_area();
    assert!(more > area);
}

#[test]
fn test_invalid_sequences() {
    assert!(CrossroadSequence::branches(3, &[0]).is_err());
    assert!(CrossroadSequence::branches(8, &[8]).is_err());
    assert!(CrossroadSequence::new(8, [Item::Sector(2, 2)]).is_err());
    assert!(enumerate(30, false).is_err());
}
