//! ip2mmdb - IP2Location LITE CSV to MaxMind DB converter
//!
//! Converts CSV exports of IPv4 geolocation ranges (the IP2Location LITE
//! DB1 country and DB11 city schemas) into MaxMind DB v2 binary files that
//! any conformant MMDB reader can query.
//!
//! # Quick Start
//!
//! ```rust
//! use ip2mmdb::{GeoPayload, MmdbBuilder, RangeRow};
//!
//! let mut builder = MmdbBuilder::new();
//! builder.add_row(&RangeRow {
//!     start: 16777216, // 1.0.0.0
//!     end: 16777471,   // 1.0.0.255
//!     payload: GeoPayload::Country {
//!         iso_code: "US".to_string(),
//!         country_name: "United States".to_string(),
//!     },
//! })?;
//!
//! let database = builder.build()?;
//! assert!(!database.is_empty());
//! # Ok::<(), ip2mmdb::BuildError>(())
//! ```
//!
//! Files come from [`RowReader`], which streams the headerless CSV and
//! detects the schema from the column count; [`MmdbBuilder::write_to_path`]
//! writes the result atomically.
//!
//! # Pipeline
//!
//! ```text
//! CSV rows ──> range expansion ──> CIDR entries ─────────┐
//!         └──> token / coordinate / payload tables        │
//!                      │                                  │
//!                      v                                  v
//!              data section (dedup'd)  ──offsets──>  search tree
//!                      │                                  │
//!                      └───────> file assembly <──────────┘
//!                            tree | marker | data | metadata
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CSV ingestion for the supported input schemas
pub mod csv_import;
/// MMDB data section and metadata encoding
pub mod data_section;
/// Error types
pub mod error;
/// Search tree construction and serialization
pub mod ip_tree_builder;
/// The end-to-end database builder
pub mod mmdb_builder;
/// IPv4 range to CIDR expansion
pub mod range;
/// Input rows and geographic payloads
pub mod record;
/// Shared format types and constants
pub mod types;

pub use crate::csv_import::RowReader;
pub use crate::error::{BuildError, Result};
pub use crate::mmdb_builder::{BuilderStats, MmdbBuilder};
pub use crate::record::{GeoPayload, RangeRow};
pub use crate::types::{DbMode, RecordSize};
