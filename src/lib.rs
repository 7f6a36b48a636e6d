//! # starindex
//!
//! Building blocks for **lost-in-space star identification**: fast lookup of
//! catalog stars by direction, geometric keys for small star groups, and
//! the attitude math that turns a matched pair into a rotation.
//!
//! A star identifier needs three things from its catalog. It has to find
//! every star near a given direction, match a group observed in the sensor
//! frame to a group in the catalog frame by something that does not depend
//! on attitude, and recover the rotation once two frames agree. This crate
//! supplies each piece:
//!
//! - **Spatial indexes**: [`QuadTree`] and [`KdTree`] place unit vectors on a
//!   Mercator square and answer radius queries through [`SpatialIndex`]
//! - **Invariants**: [`Trio`] (planar and spherical area and polar moment)
//!   and [`Asterism`] (canonical ordering and 4-value geometric hash)
//! - **Range index**: [`KVector`] finds every row of a sorted column within a
//!   value window in constant time plus output size
//! - **Attitude**: [`Rotation`] wraps a unit quaternion, with TRIAD for a pair
//!   of vectors and an SVD solution for many
//! - **Catalog**: [`MemoryCatalog`] stores stars and invariant tables, and
//!   [`CatalogSource`] is the interface the rest of the crate reads through
//!
//! ## Example
//!
//! ```
//! use starindex::{KdTree, Rotation, SpatialIndex, Star};
//!
//! let catalog = vec![
//!     Star::from_radec(10.0, 20.0).with_label(1),
//!     Star::from_radec(12.0, 21.0).with_label(2),
//!     Star::from_radec(200.0, -40.0).with_label(3),
//! ];
//! let tree = KdTree::build(&catalog, 1000.0);
//! let near = tree.nearby_exact(&catalog[0], 5.0, 10, &catalog);
//! assert_eq!(near.len(), 2);
//!
//! // Recover the rotation carrying the catalog pair onto a rotated copy.
//! let truth = Rotation::from_axis_angle(&Star::new(0.0, 0.0, 1.0), 30.0).unwrap();
//! let seen = [truth.rotate(&catalog[0]), truth.rotate(&catalog[1])];
//! let solved = Rotation::rotation_across_frames(&seen, &[catalog[0], catalog[1]]).unwrap();
//! assert!(solved.approx_eq(&truth, 1e-9));
//! ```
//!
//! ## Invariant tables
//!
//! [`catalog::tables`] builds pair, trio and quad tables from a star table.
//! Each is sorted on its key and carries a K-vector, so an observed key with
//! a tolerance becomes one [`CatalogSource::range_query`]:
//!
//! ```
//! use starindex::catalog::tables::{generate_pair_table, TableConfig};
//! use starindex::{CatalogSource, MemoryCatalog, Star};
//!
//! let mut catalog = MemoryCatalog::new();
//! let stars = [
//!     Star::from_radec(0.0, 0.0).with_label(1).with_magnitude(1.0),
//!     Star::from_radec(3.0, 0.0).with_label(2).with_magnitude(2.0),
//!     Star::from_radec(0.0, 7.0).with_label(3).with_magnitude(3.0),
//! ];
//! catalog.insert_stars("stars", &stars).unwrap();
//! generate_pair_table(&mut catalog, "stars", "pairs", &TableConfig::default()).unwrap();
//!
//! let rows = catalog.range_query("pairs", "theta", 2.9, 3.1, 4).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod catalog;
pub mod error;
pub mod invariants;
pub mod kvector;
pub mod mercator;
pub mod rotation;
pub mod star;
pub mod tree;

pub use catalog::{CatalogSource, MemoryCatalog, Table, STAR_COLUMNS};
pub use error::{CatalogError, GeometryError, KVectorError};
pub use invariants::{Asterism, Trio, MALFORMED_HASH};
pub use kvector::KVector;
pub use mercator::{Bounds, Mercator};
pub use rotation::Rotation;
pub use star::Star;
pub use tree::{KdTree, QuadTree, QuadTreeConfig, SpatialIndex};
