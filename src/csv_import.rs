//! CSV Import
//!
//! Streams IP2Location LITE exports into [`RangeRow`]s. The input is a
//! headerless UTF-8 CSV; each row's column count selects the schema
//! (4 columns → country, 10 columns → city). IP columns are decimal-encoded
//! 32-bit addresses.

use crate::error::{BuildError, Result};
use crate::record::{GeoPayload, RangeRow};
use std::fs::File;
use std::path::Path;

/// Streaming reader over an input CSV
///
/// Rows are parsed one at a time; errors carry the 1-based row number.
#[derive(Debug)]
pub struct RowReader {
    reader: csv::Reader<File>,
    record: csv::StringRecord,
    row: u64,
}

impl RowReader {
    /// Open an input file, rejecting paths that do not end in `.csv`
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            return Err(BuildError::Input(format!(
                "{}: only .csv files are accepted",
                path.display()
            )));
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| BuildError::Input(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            reader,
            record: csv::StringRecord::new(),
            row: 0,
        })
    }

    /// Read and parse the next row, or `None` at end of input
    pub fn read_row(&mut self) -> Result<Option<RangeRow>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.row += 1;
        parse_record(&self.record, self.row).map(Some)
    }

    /// Number of rows read so far
    pub fn rows_read(&self) -> u64 {
        self.row
    }
}

fn parse_record(record: &csv::StringRecord, row: u64) -> Result<RangeRow> {
    let payload = match record.len() {
        4 => GeoPayload::Country {
            iso_code: field(record, 2),
            country_name: field(record, 3),
        },
        // Column 9 (timezone in DB11 exports) is ignored.
        10 => {
            let latitude = field(record, 6);
            let longitude = field(record, 7);
            for (name, value) in [("latitude", &latitude), ("longitude", &longitude)] {
                if value.parse::<f64>().is_err() {
                    return Err(BuildError::Input(format!(
                        "row {}: {} {:?} is not a number",
                        row, name, value
                    )));
                }
            }
            GeoPayload::City {
                iso_code: field(record, 2),
                country_name: field(record, 3),
                region: field(record, 4),
                city: field(record, 5),
                latitude,
                longitude,
                postal_code: field(record, 8),
            }
        }
        n => {
            return Err(BuildError::Input(format!(
                "row {}: expected 4 or 10 columns, found {}",
                row, n
            )))
        }
    };

    let start = parse_ip(record, 0, row)?;
    let end = parse_ip(record, 1, row)?;
    if start > end {
        return Err(BuildError::Input(format!(
            "row {}: range start {} exceeds end {}",
            row, start, end
        )));
    }

    Ok(RangeRow {
        start,
        end,
        payload,
    })
}

fn field(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}

fn parse_ip(record: &csv::StringRecord, idx: usize, row: u64) -> Result<u32> {
    let raw = record.get(idx).unwrap_or("");
    raw.trim().parse::<u32>().map_err(|_| {
        BuildError::Input(format!(
            "row {}: IP column {} is not a decimal 32-bit address: {:?}",
            row,
            idx + 1,
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DbMode;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let mut f = std::fs::File::create(dir.path().join("input.csv")).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        dir
    }

    fn read_all(dir: &tempfile::TempDir) -> Result<Vec<RangeRow>> {
        let mut reader = RowReader::from_path(&dir.path().join("input.csv"))?;
        let mut rows = Vec::new();
        while let Some(row) = reader.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    #[test]
    fn test_country_rows() {
        let dir = csv_file("16777216,16777471,\"US\",\"United States\"\n");
        let rows = read_all(&dir).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start, 16777216);
        assert_eq!(rows[0].end, 16777471);
        assert_eq!(rows[0].payload.mode(), DbMode::Country);
        assert_eq!(rows[0].payload.key(), "US");
    }

    #[test]
    fn test_city_rows() {
        let dir = csv_file(
            "0,255,\"GB\",\"United Kingdom\",\"England\",\"London\",51.5,-0.1,\"EC1\",\"+00:00\"\n",
        );
        let rows = read_all(&dir).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payload.mode(), DbMode::City);
        assert_eq!(rows[0].payload.key(), "GB|England|London|51.5|-0.1|EC1");
    }

    #[test]
    fn test_rejects_wrong_column_count() {
        let dir = csv_file("1,2,\"US\"\n");
        let err = read_all(&dir).unwrap_err();
        assert!(err.to_string().contains("expected 4 or 10 columns"));
    }

    #[test]
    fn test_rejects_non_numeric_ip() {
        let dir = csv_file("1.2.3.4,16777471,\"US\",\"United States\"\n");
        let err = read_all(&dir).unwrap_err();
        assert!(err.to_string().contains("decimal 32-bit address"));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let dir = csv_file("20,10,\"US\",\"United States\"\n");
        let err = read_all(&dir).unwrap_err();
        assert!(err.to_string().contains("exceeds end"));
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let dir = csv_file(
            "0,255,\"GB\",\"United Kingdom\",\"England\",\"London\",north,-0.1,\"EC1\",\"\"\n",
        );
        let err = read_all(&dir).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_rejects_non_csv_extension() {
        let err = RowReader::from_path(Path::new("ranges.txt")).unwrap_err();
        assert!(matches!(err, BuildError::Input(_)));
        assert!(err.to_string().contains(".csv"));
    }

    #[test]
    fn test_error_carries_row_number() {
        let dir = csv_file("1,2,\"US\",\"United States\"\nbad,4,\"CA\",\"Canada\"\n");
        let err = read_all(&dir).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
