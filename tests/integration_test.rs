//! Integration tests: build indexes and invariant tables over synthetic
//! catalogs, observe part of the sky through a known rotation, and verify the
//! catalog side recovers the stars and the attitude.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rand_distr::{Distribution, Normal};
use starindex::catalog::tables::{
    generate_pair_table, generate_quad_table, generate_trio_table, TableConfig, TrioKind,
};
use starindex::{
    Asterism, CatalogSource, KdTree, MemoryCatalog, QuadTree, Rotation, SpatialIndex, Star, Trio,
};

const WIDTH: f64 = 1000.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

/// Random labelled stars with magnitudes in `[0, 6)`. Label equals position.
fn random_catalog(n: u64, seed: u64) -> Vec<Star> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| Star::chance_labeled(&mut rng, i).with_magnitude(rng.random_range(0.0..6.0)))
        .collect()
}

fn sorted_labels(stars: &[Star]) -> Vec<u64> {
    let mut labels: Vec<u64> = stars.iter().filter_map(|s| s.label).collect();
    labels.sort_unstable();
    labels
}

/// Add isotropic Gaussian noise to a direction and renormalize.
fn perturb(star: &Star, noise: &Normal<f64>, rng: &mut StdRng) -> Star {
    Star::new(
        star.x + noise.sample(rng),
        star.y + noise.sample(rng),
        star.z + noise.sample(rng),
    )
    .as_unit()
    .define_label(star.label.unwrap_or_default())
}

#[test]
fn five_star_catalog_matches_brute_force() {
    init_tracing();

    let catalog = [
        Star::from_radec(40.0, 10.0).with_label(1),
        Star::from_radec(45.0, 14.0).with_label(2),
        Star::from_radec(31.0, 2.0).with_label(3),
        Star::from_radec(60.0, 12.0).with_label(4),
        Star::from_radec(220.0, -35.0).with_label(5),
    ];
    let expected: Vec<u64> = sorted_labels(
        &catalog
            .iter()
            .filter(|s| catalog[0].angle_between(s) < 15.0)
            .copied()
            .collect::<Vec<_>>(),
    );
    assert!(expected.contains(&1));
    assert!(!expected.contains(&5));

    let quad = QuadTree::build(&catalog, WIDTH);
    let kd = KdTree::build(&catalog, WIDTH);
    for found in [
        quad.nearby(&catalog[0], 15.0, 10, &catalog),
        kd.nearby(&catalog[0], 15.0, 10, &catalog),
    ] {
        // The box search may return extra stars, never fewer.
        let found = sorted_labels(&found);
        assert!(expected.iter().all(|l| found.contains(l)));

        let exact: Vec<Star> = found
            .iter()
            .map(|&l| catalog[l as usize - 1])
            .filter(|s| catalog[0].angle_between(s) < 15.0)
            .collect();
        assert_eq!(sorted_labels(&exact), expected);
    }
}

#[test]
fn trees_agree_with_brute_force_over_the_sky() {
    init_tracing();

    let catalog = random_catalog(4000, 1);
    let quad = QuadTree::build(&catalog, WIDTH);
    let kd = KdTree::build(&catalog, WIDTH);
    let mut rng = StdRng::seed_from_u64(2);

    for _ in 0..40 {
        let focus = Star::chance(&mut rng);
        let theta = rng.random_range(1.0..20.0);
        let expected: Vec<u64> = sorted_labels(
            &catalog
                .iter()
                .filter(|s| focus.angle_between(s) <= theta)
                .copied()
                .collect::<Vec<_>>(),
        );

        let from_quad = sorted_labels(&quad.nearby_exact(&focus, theta, usize::MAX, &catalog));
        let from_kd = sorted_labels(&kd.nearby_exact(&focus, theta, usize::MAX, &catalog));
        assert_eq!(from_quad, expected);
        assert_eq!(from_kd, expected);
    }
}

#[test]
fn triad_and_wahba_recover_attitude_under_noise() {
    init_tracing();

    let mut rng = StdRng::seed_from_u64(3);
    let noise = Normal::new(0.0, 1e-5).unwrap();

    for _ in 0..20 {
        let truth = Rotation::chance(&mut rng);

        // A small field around a random boresight.
        let boresight = Star::chance(&mut rng);
        let field: Vec<Star> = random_catalog(3000, rng.random())
            .into_iter()
            .filter(|s| boresight.angle_between(s) < 10.0)
            .collect();
        if field.len() < 3 {
            continue;
        }
        let observed: Vec<Star> = truth
            .rotate_all(&field)
            .iter()
            .map(|s| perturb(s, &noise, &mut rng))
            .collect();

        // Pick the most separated pair for TRIAD.
        let mut best = (0, 1, 0.0);
        for i in 0..field.len() {
            for j in i + 1..field.len() {
                let d = field[i].angle_between(&field[j]);
                if d > best.2 {
                    best = (i, j, d);
                }
            }
        }
        let (i, j, _) = best;
        let triad = Rotation::rotation_across_frames(
            &[observed[i], observed[j]],
            &[field[i], field[j]],
        )
        .unwrap();
        assert!((triad.inverse() * truth).angle() < 0.05);

        let wahba = Rotation::solve_wahba(&observed, &field).unwrap();
        assert!((wahba.inverse() * truth).angle() < 0.01);
        for (o, f) in observed.iter().zip(&field) {
            assert!(o.angle_between(&wahba.rotate(f)) < 0.01);
        }
    }
}

#[test]
fn rotated_pair_is_found_in_pair_table() {
    init_tracing();

    let stars = random_catalog(600, 4);
    let mut catalog = MemoryCatalog::new();
    catalog.insert_stars("stars", &stars).unwrap();
    let config = TableConfig {
        fov_deg: 12.0,
        ..Default::default()
    };
    let rows = generate_pair_table(&mut catalog, "stars", "pairs", &config).unwrap();
    assert!(rows > 0);

    let (a, b) = (0..stars.len())
        .flat_map(|i| (i + 1..stars.len()).map(move |j| (i, j)))
        .find(|&(i, j)| stars[i].angle_between(&stars[j]) < 12.0)
        .unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let truth = Rotation::chance(&mut rng);
    let seen = [truth.rotate(&stars[a]), truth.rotate(&stars[b])];
    let theta = seen[0].angle_between(&seen[1]);

    let candidates = catalog
        .range_query("pairs", "theta", theta - 1e-6, theta + 1e-6, 8)
        .unwrap();
    let want = [a as f64, b as f64];
    let hit = candidates
        .iter()
        .find(|r| {
            (r[0] == want[0] && r[1] == want[1]) || (r[0] == want[1] && r[1] == want[0])
        })
        .expect("observed pair missing from pair table");

    // Resolve the catalog stars by label and recover the attitude.
    let cat_a = catalog.star_by_label("stars", hit[0] as u64).unwrap().unwrap();
    let cat_b = catalog.star_by_label("stars", hit[1] as u64).unwrap().unwrap();
    let (obs_a, obs_b) = if cat_a.label == seen[0].label {
        (seen[0], seen[1])
    } else {
        (seen[1], seen[0])
    };
    let solved = Rotation::rotation_across_frames(&[obs_a, obs_b], &[cat_a, cat_b]).unwrap();
    assert!(solved.approx_eq(&truth, 1e-9));
}

#[test]
fn rotated_trio_is_found_in_spherical_trio_table() {
    init_tracing();

    let stars = random_catalog(400, 6);
    let mut catalog = MemoryCatalog::new();
    catalog.insert_stars("stars", &stars).unwrap();
    let config = TableConfig {
        fov_deg: 15.0,
        max_groups_per_star: Some(40),
        ..Default::default()
    };
    let n = generate_trio_table(&mut catalog, "stars", "trios", TrioKind::Spherical, &config)
        .unwrap();
    assert!(n > 0);

    let table = catalog.table("trios").unwrap();
    let row = table.row(n / 2).unwrap();
    let members: Vec<Star> = row[..3].iter().map(|&l| stars[l as usize]).collect();

    let mut rng = StdRng::seed_from_u64(7);
    let truth = Rotation::chance(&mut rng);
    let seen = truth.rotate_all(&members);
    let area = Trio::new(seen[0], seen[1], seen[2]).spherical_area().unwrap();
    assert!((area - row[3]).abs() < 1e-12);

    let candidates = catalog
        .range_query("trios", "a", area - 1e-10, area + 1e-10, 4)
        .unwrap();
    assert!(candidates.iter().any(|r| r[..3] == row[..3]));
}

#[test]
fn quad_hash_lookup_returns_the_quad() {
    init_tracing();

    let stars = random_catalog(400, 8);
    let mut catalog = MemoryCatalog::new();
    catalog.insert_stars("stars", &stars).unwrap();
    let config = TableConfig {
        fov_deg: 20.0,
        max_groups_per_star: Some(10),
        ..Default::default()
    };
    let n = generate_quad_table(&mut catalog, "stars", "quads", &config).unwrap();
    assert!(n > 0);

    let table = catalog.table("quads").unwrap();
    for r in [0, n / 2, n - 1] {
        let row = table.row(r).unwrap();
        let quad: Vec<Star> = row[..4].iter().map(|&l| stars[l as usize]).collect();
        let hash = Asterism::from_slice(&quad).unwrap().hash();

        let candidates = catalog
            .range_query("quads", "cx", hash[0] - 1e-9, hash[0] + 1e-9, 4)
            .unwrap();
        assert!(candidates.iter().any(|c| c[..4] == row[..4]));
    }
}

#[test]
fn catalog_with_tables_survives_save_and_load() {
    init_tracing();

    let stars = random_catalog(300, 9);
    let mut catalog = MemoryCatalog::new();
    catalog.insert_stars("stars", &stars).unwrap();
    generate_pair_table(&mut catalog, "stars", "pairs", &TableConfig::default()).unwrap();

    let path = std::env::temp_dir().join("starindex_integration_catalog.rkyv");
    let path = path.to_str().unwrap();
    catalog.save_to_file(path).unwrap();
    let loaded = MemoryCatalog::load_from_file(path).unwrap();
    let _ = std::fs::remove_file(path);

    let before = catalog.range_query("pairs", "theta", 4.0, 6.0, 0).unwrap();
    let after = loaded.range_query("pairs", "theta", 4.0, 6.0, 0).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        sorted_labels(&loaded.list_of_unit_vectors("stars").unwrap()),
        sorted_labels(&stars)
    );
}
