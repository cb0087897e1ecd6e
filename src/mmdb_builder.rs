//! MMDB Database Builder
//!
//! Drives the whole conversion: rows go in, a finished MMDB byte image
//! comes out. The builder accumulates CIDR entries and the string/coordinate
//! tables during ingest, then `build()` runs the back half of the pipeline:
//! data section, search tree, record-width check, assembly, metadata.
//!
//! The first row fixes the database mode; every later row must match it.

use crate::data_section::{DataSection, DataValue, BASE_TOKENS, CITY_TOKENS};
use crate::error::{BuildError, Result};
use crate::ip_tree_builder::IpTreeBuilder;
use crate::range::summarize_range;
use crate::record::{GeoPayload, RangeRow};
use crate::types::{DbMode, DATA_SECTION_MARKER, METADATA_MARKER};
use log::info;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

/// One CIDR awaiting insertion, tied to its payload by key
#[derive(Debug, Clone)]
struct CidrEntry {
    network: u32,
    prefix_len: u8,
    payload_key: String,
}

/// Builder for a complete MMDB file
pub struct MmdbBuilder {
    mode: Option<DbMode>,
    entries: Vec<CidrEntry>,
    payloads: BTreeMap<String, GeoPayload>,
    tokens: BTreeSet<String>,
    latlongs: BTreeSet<String>,
    rows: u64,
    build_epoch: Option<u64>,
}

/// Counters describing what the builder has accumulated
#[derive(Debug, Clone)]
pub struct BuilderStats {
    /// Input rows ingested
    pub rows: u64,
    /// CIDR blocks produced by range expansion
    pub cidr_entries: usize,
    /// Distinct payload records
    pub payload_records: usize,
    /// Distinct geographic strings (field names excluded)
    pub tokens: usize,
    /// Distinct coordinate strings
    pub coordinates: usize,
}

impl MmdbBuilder {
    /// Create an empty builder; the first row decides the mode
    pub fn new() -> Self {
        Self {
            mode: None,
            entries: Vec::new(),
            payloads: BTreeMap::new(),
            tokens: BTreeSet::new(),
            latlongs: BTreeSet::new(),
            rows: 0,
            build_epoch: None,
        }
    }

    /// Pin `build_epoch` instead of reading the clock
    ///
    /// Two builds of the same input with the same pinned epoch are
    /// byte-identical.
    pub fn with_build_epoch(mut self, epoch: u64) -> Self {
        self.build_epoch = Some(epoch);
        self
    }

    /// Mode locked by the first row, if any rows were added
    pub fn mode(&self) -> Option<DbMode> {
        self.mode
    }

    /// Ingest one input row
    ///
    /// Expands the row's range into CIDRs and folds its payload into the
    /// dedup tables. Rows sharing a payload key collapse to one record;
    /// the later row's payload wins.
    pub fn add_row(&mut self, row: &RangeRow) -> Result<()> {
        let mode = row.payload.mode();
        match self.mode {
            None => self.mode = Some(mode),
            Some(locked) if locked != mode => {
                return Err(BuildError::Input(format!(
                    "{} row in a {} build: the first row fixes the schema",
                    mode, locked
                )));
            }
            Some(_) => {}
        }

        // Coordinates must be numeric before they reach the double table.
        if let GeoPayload::City {
            latitude,
            longitude,
            ..
        } = &row.payload
        {
            for (name, value) in [("latitude", latitude), ("longitude", longitude)] {
                if value.parse::<f64>().is_err() {
                    return Err(BuildError::Input(format!(
                        "{} {:?} is not a number",
                        name, value
                    )));
                }
            }
        }

        let key = row.payload.key();
        row.payload
            .collect_strings(&mut self.tokens, &mut self.latlongs);
        self.payloads.insert(key.clone(), row.payload.clone());

        for cidr in summarize_range(row.start, row.end)? {
            self.entries.push(CidrEntry {
                network: cidr.network,
                prefix_len: cidr.prefix_len,
                payload_key: key.clone(),
            });
        }
        self.rows += 1;
        Ok(())
    }

    /// Current accumulation counters
    pub fn stats(&self) -> BuilderStats {
        BuilderStats {
            rows: self.rows,
            cidr_entries: self.entries.len(),
            payload_records: self.payloads.len(),
            tokens: self.tokens.len(),
            coordinates: self.latlongs.len(),
        }
    }

    /// Run the back half of the pipeline and return the finished file image
    pub fn build(mut self) -> Result<Vec<u8>> {
        let mode = self
            .mode
            .ok_or_else(|| BuildError::Input("no input rows".to_string()))?;

        for token in BASE_TOKENS {
            self.tokens.insert(token.to_string());
        }
        if mode == DbMode::City {
            for token in CITY_TOKENS {
                self.tokens.insert(token.to_string());
            }
        }

        info!(
            "encoding data section: {} tokens, {} coordinates, {} payloads",
            self.tokens.len(),
            self.latlongs.len(),
            self.payloads.len()
        );
        let data = DataSection::encode(&self.tokens, &self.latlongs, &self.payloads)?;

        info!("building search tree from {} prefixes", self.entries.len());
        // Canonical insertion order makes the arena layout, and with it the
        // whole file, a pure function of the input set. The sort is stable,
        // so equal prefixes keep their ingest order and the later row wins.
        self.entries
            .sort_by_key(|e| (e.network, e.prefix_len));
        let mut tree = IpTreeBuilder::new(mode.record_size());
        for entry in &self.entries {
            let offset = data.payload_offset(&entry.payload_key).ok_or_else(|| {
                BuildError::Encoding(format!(
                    "payload {:?} missing from data section",
                    entry.payload_key
                ))
            })?;
            tree.insert(entry.network, entry.prefix_len, offset)?;
        }
        let (tree_bytes, node_count) = tree.build()?;

        // Every data pointer must fit the record width:
        // node_count + 16 + len(data) < 2^R.
        let record_bits = mode.record_size().bits();
        if node_count as u64 + 16 + data.len() as u64 >= 1u64 << record_bits {
            return Err(BuildError::Encoding(format!(
                "{} nodes and {} data bytes exceed {}-bit records",
                node_count,
                data.len(),
                record_bits
            )));
        }

        info!(
            "assembling database: {} nodes, {} data bytes",
            node_count,
            data.len()
        );
        let mut out =
            Vec::with_capacity(tree_bytes.len() + 16 + data.len() + METADATA_MARKER.len() + 256);
        out.extend_from_slice(&tree_bytes);
        out.extend_from_slice(&DATA_SECTION_MARKER);
        out.extend_from_slice(data.bytes());
        out.extend_from_slice(METADATA_MARKER);
        metadata(mode, node_count, self.effective_epoch()).write(&mut out)?;

        Ok(out)
    }

    /// Build and write atomically: temp file in the target directory,
    /// renamed over `path` only on full success
    pub fn write_to_path(self, path: &Path) -> Result<()> {
        let bytes = self.build()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            BuildError::Output(format!("creating temporary file in {}: {}", dir.display(), e))
        })?;
        tmp.write_all(&bytes)
            .map_err(|e| BuildError::Output(format!("writing {}: {}", path.display(), e)))?;
        tmp.persist(path)
            .map_err(|e| BuildError::Output(format!("renaming into {}: {}", path.display(), e)))?;

        info!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn effective_epoch(&self) -> u64 {
        self.build_epoch.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
    }
}

impl Default for MmdbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata(mode: DbMode, node_count: u32, build_epoch: u64) -> DataValue {
    let mut description = BTreeMap::new();
    description.insert(
        "en".to_string(),
        DataValue::String(mode.description()),
    );

    let mut map = BTreeMap::new();
    map.insert(
        "binary_format_major_version".to_string(),
        DataValue::uint(2),
    );
    map.insert(
        "binary_format_minor_version".to_string(),
        DataValue::uint(0),
    );
    map.insert("build_epoch".to_string(), DataValue::uint(build_epoch));
    map.insert(
        "database_type".to_string(),
        DataValue::String(mode.database_type().to_string()),
    );
    map.insert("description".to_string(), DataValue::Map(description));
    map.insert("ip_version".to_string(), DataValue::uint(4));
    map.insert(
        "languages".to_string(),
        DataValue::Array(vec![DataValue::String("en".to_string())]),
    );
    map.insert(
        "node_count".to_string(),
        DataValue::uint(node_count as u64),
    );
    map.insert(
        "record_size".to_string(),
        DataValue::uint(mode.record_size().bits() as u64),
    );
    DataValue::Map(map)
}
