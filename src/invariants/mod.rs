//! Keys computed from small groups of stars.
//!
//! - [`trio`]: planar and spherical area / polar moment of three vectors.
//! - [`asterism`]: canonical ordering and geometric hash of four vectors.
//! - [`combinations`]: brightest-first enumeration of the groups themselves.
//!
//! Trio invariants depend only on relative geometry, so the same key comes
//! out of the catalog frame and out of a rotated sensor frame. The quad hash
//! is taken on the Mercator square and is only stable for quads compared in
//! the same frame. Catalog-side tables of these keys are built by
//! [`crate::catalog::tables`] and searched through a [`crate::KVector`].

pub mod asterism;
pub mod combinations;
pub mod trio;

pub use asterism::{Asterism, MALFORMED_HASH};
pub use combinations::BrightestFirst;
pub use trio::{Trio, DEFAULT_MOMENT_DEPTH, MAX_MOMENT_DEPTH};
