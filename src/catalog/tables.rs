//! Generation of invariant lookup tables from a star table.
//!
//! Each generator takes the stars of a source table, forms every pair, trio
//! or quad whose members are mutually within the field of view, computes the
//! group's key, and writes one row per group into a new table. The table is
//! then sorted on its key and given a K-vector, ready for
//! [`CatalogSource::range_query`].
//!
//! Groups are found star by star: for each star (brightest first) a k-d tree
//! supplies its neighbours within the field of view, and the group is
//! completed from neighbours that come later in brightness order, so every
//! group is produced exactly once.

use tracing::{debug, info};

use super::{CatalogSource, MemoryCatalog};
use crate::error::CatalogError;
use crate::invariants::{Asterism, BrightestFirst, Trio, DEFAULT_MOMENT_DEPTH, MALFORMED_HASH};
use crate::tree::{KdTree, SpatialIndex};
use crate::Star;

/// Projection width used for the neighbour search.
const NEIGHBOUR_PROJECTION_WIDTH: f64 = 1000.0;

/// Column layout of a pair table; keyed on `theta`.
pub const PAIR_COLUMNS: [&str; 3] = ["label_a", "label_b", "theta"];

/// Column layout of a trio table; keyed on area `a`, `i` is the polar moment.
pub const TRIO_COLUMNS: [&str; 5] = ["label_a", "label_b", "label_c", "a", "i"];

/// Column layout of a quad table; keyed on `cx`. Labels are in `A, B, C, D`
/// order.
pub const QUAD_COLUMNS: [&str; 8] = [
    "label_a", "label_b", "label_c", "label_d", "cx", "cy", "dx", "dy",
];

/// Which triangle invariants a trio table stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrioKind {
    Planar,
    Spherical,
}

/// Settings shared by the table generators.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Largest separation, in degrees, between any two stars of a group.
    pub fov_deg: f64,
    /// Only stars brighter than this magnitude are used, when set.
    pub magnitude_limit: Option<f64>,
    /// Quadrisection depth for spherical polar moments.
    pub moment_depth: u32,
    /// Stop after this many groups per anchor star, when set.
    pub max_groups_per_star: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            fov_deg: 20.0,
            magnitude_limit: None,
            moment_depth: DEFAULT_MOMENT_DEPTH,
            max_groups_per_star: None,
        }
    }
}

/// Source stars in brightness order, filtered by the magnitude limit.
/// Stars without a magnitude sort last.
fn source_stars(
    catalog: &MemoryCatalog,
    source: &str,
    config: &TableConfig,
) -> Result<Vec<Star>, CatalogError> {
    let mut stars = catalog.list_of_unit_vectors(source)?;
    if let Some(limit) = config.magnitude_limit {
        stars.retain(|s| s.magnitude.is_some_and(|m| m < limit));
    }
    stars.sort_by(|a, b| {
        let ma = a.magnitude.unwrap_or(f64::INFINITY);
        let mb = b.magnitude.unwrap_or(f64::INFINITY);
        ma.total_cmp(&mb)
    });
    Ok(stars)
}

/// Every group of an anchor plus `R` later stars, all pairwise closer than
/// the field of view. Positions index into `stars`.
fn groups_within_fov<const R: usize>(
    stars: &[Star],
    config: &TableConfig,
) -> Vec<(usize, [usize; R])> {
    let tree = KdTree::build(stars, NEIGHBOUR_PROJECTION_WIDTH);
    let cap = config.max_groups_per_star.unwrap_or(usize::MAX);
    let mut groups = Vec::new();

    for (anchor, star) in stars.iter().enumerate() {
        let mut later: Vec<usize> = tree
            .nearby_indices(star, config.fov_deg, usize::MAX)
            .into_iter()
            .filter(|&i| i > anchor && star.angle_between(&stars[i]) < config.fov_deg)
            .collect();
        later.sort_unstable();

        let mut taken = 0;
        for rest in BrightestFirst::<R>::new(&later) {
            if taken >= cap {
                break;
            }
            let members: Vec<Star> = rest.iter().map(|&i| stars[i]).collect();
            if Star::within_angle(&members, config.fov_deg) {
                groups.push((anchor, rest));
                taken += 1;
            }
        }
    }
    debug!("Found {} groups of {} within {} deg", groups.len(), R + 1, config.fov_deg);
    groups
}

fn label_of(s: &Star) -> f64 {
    s.label.map_or(f64::NAN, |l| l as f64)
}

/// Write `rows` into a fresh table `target` and index it on `key`.
fn publish(
    catalog: &mut MemoryCatalog,
    target: &str,
    columns: &[&str],
    key: &str,
    rows: Vec<Vec<f64>>,
) -> Result<usize, CatalogError> {
    catalog.create_table(target, columns)?;
    let n = rows.len();
    for row in &rows {
        catalog.insert_row(target, row)?;
    }
    catalog.create_k_vector(target, key)?;
    info!("Generated table '{}' with {} rows", target, n);
    Ok(n)
}

/// Table of every star pair within the field of view and its separation in
/// degrees. Returns the number of rows written.
pub fn generate_pair_table(
    catalog: &mut MemoryCatalog,
    source: &str,
    target: &str,
    config: &TableConfig,
) -> Result<usize, CatalogError> {
    let stars = source_stars(catalog, source, config)?;
    let rows = groups_within_fov::<1>(&stars, config)
        .into_iter()
        .map(|(a, [b])| {
            let (sa, sb) = (&stars[a], &stars[b]);
            vec![label_of(sa), label_of(sb), sa.angle_between(sb)]
        })
        .collect();
    publish(catalog, target, &PAIR_COLUMNS, "theta", rows)
}

/// Table of every star trio within the field of view with its area and polar
/// moment. Trios whose spherical invariants cannot be computed are skipped.
pub fn generate_trio_table(
    catalog: &mut MemoryCatalog,
    source: &str,
    target: &str,
    kind: TrioKind,
    config: &TableConfig,
) -> Result<usize, CatalogError> {
    let stars = source_stars(catalog, source, config)?;
    let mut skipped = 0usize;
    let rows: Vec<Vec<f64>> = groups_within_fov::<2>(&stars, config)
        .into_iter()
        .filter_map(|(a, [b, c])| {
            let trio = Trio::new(stars[a], stars[b], stars[c]);
            let key = match kind {
                TrioKind::Planar => Ok((trio.planar_area(), trio.planar_moment())),
                TrioKind::Spherical => trio.spherical_area().and_then(|area| {
                    trio.spherical_moment(config.moment_depth)
                        .map(|moment| (area, moment))
                }),
            };
            match key {
                Ok((area, moment)) => Some(vec![
                    label_of(&stars[a]),
                    label_of(&stars[b]),
                    label_of(&stars[c]),
                    area,
                    moment,
                ]),
                Err(e) => {
                    debug!("Skipping trio: {}", e);
                    skipped += 1;
                    None
                }
            }
        })
        .collect();
    if skipped > 0 {
        info!("Skipped {} trios with invalid invariants", skipped);
    }
    publish(catalog, target, &TRIO_COLUMNS, "a", rows)
}

/// Table of every star quad within the field of view with its geometric
/// hash. Quads with a malformed hash are skipped.
pub fn generate_quad_table(
    catalog: &mut MemoryCatalog,
    source: &str,
    target: &str,
    config: &TableConfig,
) -> Result<usize, CatalogError> {
    let stars = source_stars(catalog, source, config)?;
    let rows: Vec<Vec<f64>> = groups_within_fov::<3>(&stars, config)
        .into_iter()
        .filter_map(|(a, [b, c, d])| {
            let quad = Asterism::new([stars[a], stars[b], stars[c], stars[d]]);
            let hash = quad.hash();
            if hash == MALFORMED_HASH {
                return None;
            }
            let order = quad.find_order()?;
            let mut row: Vec<f64> = order.iter().map(label_of).collect();
            row.extend_from_slice(&hash);
            Some(row)
        })
        .collect();
    publish(catalog, target, &QUAD_COLUMNS, "cx", rows)
}
