//! Catalog access: the read path the indexes consume.
//!
//! [`CatalogSource`] is the narrow interface the rest of the crate needs
//! from storage: materialize a table as stars, fetch rows by a range of a
//! sorted column, and look up a single row. [`MemoryCatalog`] implements it
//! over named, column-major tables of `f64` and carries the K-vector for each
//! table's sorted column.
//!
//! A star table uses the columns [`STAR_COLUMNS`]: `i, j, k` components,
//! `label` and magnitude `m`. Missing labels and magnitudes are stored as NaN.
//! Labels must not exceed [`MAX_EXACT_LABEL`].
//!
//! Each table counts its mutations. A K-vector remembers the count at which
//! it was built, so a query after any later insert or re-sort fails with
//! [`CatalogError::StaleIndex`] instead of returning wrong rows.

pub mod tables;

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};
use tracing::info;

use crate::error::CatalogError;
use crate::{KVector, Star};

/// Column layout of a star table.
///
/// Labels are held in the `f64` `label` column, so only labels up to
/// [`MAX_EXACT_LABEL`] survive the round trip.
pub const STAR_COLUMNS: [&str; 5] = ["i", "j", "k", "label", "m"];

/// Largest label a star table stores exactly (2^53).
pub const MAX_EXACT_LABEL: u64 = 1 << 53;

/// Operations the indexing layer needs from catalog storage.
pub trait CatalogSource {
    /// Every row of a star table as a [`Star`], in row order.
    fn list_of_unit_vectors(&self, table: &str) -> Result<Vec<Star>, CatalogError>;

    /// Rows whose `column` value lies in `[low, high]`, using the K-vector
    /// built on that column. `expected` is a capacity hint.
    fn range_query(
        &self,
        table: &str,
        column: &str,
        low: f64,
        high: f64,
        expected: usize,
    ) -> Result<Vec<Vec<f64>>, CatalogError>;

    /// First row (in table order) whose `column` equals `value`.
    fn point_lookup(
        &self,
        table: &str,
        column: &str,
        value: f64,
    ) -> Result<Option<Vec<f64>>, CatalogError>;
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
struct ColumnIndex {
    column: usize,
    generation: u64,
    kvector: KVector,
}

/// A named table of `f64` columns.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
pub struct Table {
    names: Vec<String>,
    data: Vec<Vec<f64>>,
    generation: u64,
    index: Option<ColumnIndex>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            names: columns.iter().map(|c| c.to_string()).collect(),
            data: vec![Vec::new(); columns.len()],
            generation: 0,
            index: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter; bumped by every insert and sort.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|c| self.data[c].as_slice())
    }

    pub fn row(&self, r: usize) -> Option<Vec<f64>> {
        if r >= self.len() {
            return None;
        }
        Some(self.data.iter().map(|c| c[r]).collect())
    }

    /// Name of the column carrying a K-vector, if any.
    pub fn indexed_column(&self) -> Option<&str> {
        self.index
            .as_ref()
            .map(|ix| self.names[ix.column].as_str())
    }

    fn push(&mut self, row: &[f64]) {
        for (col, &v) in self.data.iter_mut().zip(row) {
            col.push(v);
        }
        self.generation += 1;
    }

    /// Reorder rows ascending by column `c`. NaN sorts last.
    fn sort_on(&mut self, c: usize) {
        let key = &self.data[c];
        let mut order: Vec<usize> = (0..key.len()).collect();
        order.sort_by(|&a, &b| key[a].total_cmp(&key[b]));
        for col in self.data.iter_mut() {
            *col = order.iter().map(|&r| col[r]).collect();
        }
        self.generation += 1;
    }

    fn star(&self, r: usize) -> Option<Star> {
        let cols: Vec<usize> = STAR_COLUMNS
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<_>>()?;
        let get = |c: usize| self.data[cols[c]].get(r).copied();
        let mut s = Star::new(get(0)?, get(1)?, get(2)?);
        let label = get(3)?;
        if label.is_finite() && label >= 0.0 {
            s.label = Some(label as u64);
        }
        let m = get(4)?;
        if !m.is_nan() {
            s.magnitude = Some(m);
        }
        Some(s)
    }
}

/// In-memory catalog of named tables.
#[derive(Debug, Clone, Default, Archive, Serialize, Deserialize)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, Table>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn table(&self, name: &str) -> Result<&Table, CatalogError> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, CatalogError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }

    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> Result<(), CatalogError> {
        if self.tables.contains_key(name) {
            return Err(CatalogError::TableExists {
                table: name.to_string(),
            });
        }
        self.tables.insert(name.to_string(), Table::new(columns));
        Ok(())
    }

    /// Remove a table, returning whether it existed.
    pub fn drop_table(&mut self, name: &str) -> bool {
        self.tables.remove(name).is_some()
    }

    pub fn insert_row(&mut self, name: &str, row: &[f64]) -> Result<(), CatalogError> {
        let table = self.table_mut(name)?;
        if row.len() != table.names.len() {
            return Err(CatalogError::RowWidth {
                table: name.to_string(),
                expected: table.names.len(),
                actual: row.len(),
            });
        }
        table.push(row);
        Ok(())
    }

    /// Append stars to a star table, creating it if needed.
    ///
    /// Fails with [`CatalogError::LabelTooLarge`] before writing anything if
    /// any label exceeds [`MAX_EXACT_LABEL`].
    pub fn insert_stars(&mut self, name: &str, stars: &[Star]) -> Result<(), CatalogError> {
        if let Some(label) = stars
            .iter()
            .filter_map(|s| s.label)
            .find(|&l| l > MAX_EXACT_LABEL)
        {
            return Err(CatalogError::LabelTooLarge {
                table: name.to_string(),
                label,
            });
        }
        if !self.tables.contains_key(name) {
            self.create_table(name, &STAR_COLUMNS)?;
        }
        for s in stars {
            let label = s.label.map_or(f64::NAN, |l| l as f64);
            let m = s.magnitude.unwrap_or(f64::NAN);
            self.insert_row(name, &[s.x, s.y, s.z, label, m])?;
        }
        Ok(())
    }

    /// Sort a table ascending on `column`. Invalidates any K-vector.
    pub fn sort_table(&mut self, name: &str, column: &str) -> Result<(), CatalogError> {
        let table = self.table_mut(name)?;
        let c = table
            .column_index(column)
            .ok_or_else(|| CatalogError::UnknownColumn {
                table: name.to_string(),
                column: column.to_string(),
            })?;
        table.sort_on(c);
        Ok(())
    }

    /// Sort a table on `column` and build its K-vector.
    pub fn create_k_vector(&mut self, name: &str, column: &str) -> Result<(), CatalogError> {
        self.sort_table(name, column)?;
        let table = self.table_mut(name)?;
        let c = table
            .column_index(column)
            .ok_or_else(|| CatalogError::UnknownColumn {
                table: name.to_string(),
                column: column.to_string(),
            })?;
        let kvector = KVector::build(&table.data[c])?;
        table.index = Some(ColumnIndex {
            column: c,
            generation: table.generation,
            kvector,
        });
        info!(
            "Built K-vector on {}.{} ({} rows)",
            name,
            column,
            table.len()
        );
        Ok(())
    }

    /// Row range of `table` whose `column` lies in `[low, high]`.
    fn indexed_rows(
        &self,
        name: &str,
        column: &str,
        low: f64,
        high: f64,
    ) -> Result<(&Table, std::ops::Range<usize>), CatalogError> {
        let table = self.table(name)?;
        let c = table
            .column_index(column)
            .ok_or_else(|| CatalogError::UnknownColumn {
                table: name.to_string(),
                column: column.to_string(),
            })?;
        let index = table
            .index
            .as_ref()
            .filter(|ix| ix.column == c)
            .ok_or_else(|| CatalogError::NoIndex {
                table: name.to_string(),
                column: column.to_string(),
            })?;
        if index.generation != table.generation {
            return Err(CatalogError::StaleIndex {
                table: name.to_string(),
                column: column.to_string(),
            });
        }
        let rows = index.kvector.query(&table.data[c], low, high)?;
        Ok((table, rows))
    }

    /// Selected `fields` of every row whose `column` lies in `[low, high]`.
    pub fn k_vector_query(
        &self,
        name: &str,
        column: &str,
        fields: &[&str],
        low: f64,
        high: f64,
    ) -> Result<Vec<Vec<f64>>, CatalogError> {
        let (table, rows) = self.indexed_rows(name, column, low, high)?;
        let cols = fields
            .iter()
            .map(|f| {
                table
                    .column_index(f)
                    .ok_or_else(|| CatalogError::UnknownColumn {
                        table: name.to_string(),
                        column: f.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .map(|r| cols.iter().map(|&c| table.data[c][r]).collect())
            .collect())
    }

    /// Stars of `name` within `theta` degrees of `focus`, by exhaustive scan.
    pub fn nearby_stars(
        &self,
        name: &str,
        focus: &Star,
        theta: f64,
        expected: usize,
    ) -> Result<Vec<Star>, CatalogError> {
        let mut out = Vec::with_capacity(expected);
        out.extend(
            self.list_of_unit_vectors(name)?
                .into_iter()
                .filter(|s| focus.angle_between(s) < theta),
        );
        Ok(out)
    }

    /// Stars of `name` brighter than magnitude `m_bar`, brightest first.
    /// Stars without a magnitude are left out.
    pub fn bright_stars(&self, name: &str, m_bar: f64) -> Result<Vec<Star>, CatalogError> {
        let mut stars: Vec<Star> = self
            .list_of_unit_vectors(name)?
            .into_iter()
            .filter(|s| s.magnitude.is_some_and(|m| m < m_bar))
            .collect();
        stars.sort_by(|a, b| {
            let ma = a.magnitude.unwrap_or(f64::INFINITY);
            let mb = b.magnitude.unwrap_or(f64::INFINITY);
            ma.total_cmp(&mb)
        });
        Ok(stars)
    }

    pub fn star_by_label(&self, name: &str, label: u64) -> Result<Option<Star>, CatalogError> {
        Ok(self
            .point_lookup(name, "label", label as f64)?
            .and_then(|row| {
                let table = self.tables.get(name)?;
                let col = |c: &str| table.column_index(c).map(|i| row[i]);
                let mut s = Star::new(col("i")?, col("j")?, col("k")?).with_label(label);
                if let Some(m) = col("m").filter(|m| !m.is_nan()) {
                    s.magnitude = Some(m);
                }
                Some(s)
            }))
    }

    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the catalog, tables and K-vectors, to a file using rkyv.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes)?;
        info!("Saved catalog to {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Load a catalog from an rkyv file.
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)?;
        let mut bytes = rkyv::util::AlignedVec::<16>::with_capacity(raw.len());
        bytes.extend_from_slice(&raw);
        let catalog = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&bytes)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        info!(
            "Loaded catalog from {}: {} tables",
            path,
            catalog.tables.len()
        );
        Ok(catalog)
    }
}

impl CatalogSource for MemoryCatalog {
    fn list_of_unit_vectors(&self, table: &str) -> Result<Vec<Star>, CatalogError> {
        let t = self.table(table)?;
        for c in STAR_COLUMNS {
            if t.column_index(c).is_none() {
                return Err(CatalogError::UnknownColumn {
                    table: table.to_string(),
                    column: c.to_string(),
                });
            }
        }
        Ok((0..t.len()).filter_map(|r| t.star(r)).collect())
    }

    fn range_query(
        &self,
        table: &str,
        column: &str,
        low: f64,
        high: f64,
        expected: usize,
    ) -> Result<Vec<Vec<f64>>, CatalogError> {
        let (t, rows) = self.indexed_rows(table, column, low, high)?;
        let mut out = Vec::with_capacity(expected.max(rows.len()));
        out.extend(rows.filter_map(|r| t.row(r)));
        Ok(out)
    }

    fn point_lookup(
        &self,
        table: &str,
        column: &str,
        value: f64,
    ) -> Result<Option<Vec<f64>>, CatalogError> {
        let t = self.table(table)?;
        let c = t
            .column_index(column)
            .ok_or_else(|| CatalogError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        // Use the K-vector when it covers this column and is current.
        if t.index.as_ref().is_some_and(|ix| ix.column == c && ix.generation == t.generation) {
            let (t, rows) = self.indexed_rows(table, column, value, value)?;
            return Ok(t.row(rows.start).filter(|_| !rows.is_empty()));
        }
        Ok(t.data[c]
            .iter()
            .position(|&v| v == value)
            .and_then(|r| t.row(r)))
    }
}
