//! Typed errors for the recoverable failure modes of the library.
//!
//! Degenerate geometry that has a defined answer (coincident triangle
//! vertices, malformed quad hashes, dead quadtree children) is reported as
//! data instead; these enums cover the cases where no meaningful value exists.

use thiserror::Error;

/// Failure computing a triangle invariant.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    /// L'Huilier's product was negative or not a number.
    #[error("spherical triangle is invalid (L'Huilier product {0})")]
    InvalidSphericalTriangle(f64),
    /// Recursion depth requested for the spherical moment exceeds the limit.
    #[error("spherical moment depth {requested} exceeds maximum {max}")]
    DepthTooLarge { requested: u32, max: u32 },
}

/// Failure building or querying a K-vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KVectorError {
    #[error("column is not sorted ascending at row {0}")]
    Unsorted(usize),
    #[error("column contains a non-finite value at row {0}")]
    NonFinite(usize),
    #[error("query bounds [{0}, {1}] are not comparable")]
    InvalidRange(f64, f64),
    /// The column handed to the query no longer matches the one indexed.
    #[error("K-vector is stale: column changed after the index was built")]
    Stale,
}

/// Failure reading from or maintaining a catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("no table named '{0}'")]
    UnknownTable(String),
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
    #[error("table '{table}' already exists")]
    TableExists { table: String },
    #[error("row has {actual} fields, table '{table}' expects {expected}")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },
    /// Labels are stored as `f64` and lose precision above 2^53.
    #[error("label {label} is too large to store exactly in table '{table}'")]
    LabelTooLarge { table: String, label: u64 },
    #[error("table '{table}' has no K-vector on column '{column}'")]
    NoIndex { table: String, column: String },
    #[error("K-vector on '{table}.{column}' was built before the table last changed")]
    StaleIndex { table: String, column: String },
    #[error(transparent)]
    KVector(#[from] KVectorError),
}
