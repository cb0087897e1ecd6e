//! MMDB Data Section Encoding
//!
//! Produces the deduplicated data section of the output database and the
//! metadata map. Uses MMDB encoding: control byte(s) followed by data, the
//! control byte carrying the type in its high 3 bits and a size in the low 5.
//!
//! Emission order is fixed so identical inputs produce identical bytes:
//!
//! 1. every token (field names plus distinct geographic strings), ascending;
//! 2. every distinct latitude/longitude string as an 8-byte double, ascending;
//! 3. every payload map, ascending payload-key order.
//!
//! Payload maps reference strings and doubles exclusively through pointers,
//! so each distinct value is stored exactly once and no backtracking is
//! needed.
//!
//! See: <https://maxmind.github.io/MaxMind-DB/>

use crate::error::{BuildError, Result};
use crate::record::GeoPayload;
use std::collections::{BTreeMap, BTreeSet};

// Type tags (high 3 bits of the control byte)
const TYPE_POINTER: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_DOUBLE: u8 = 3;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;

// Extended types (control byte type 0, raw type in the following byte)
const EXT_UINT64: u8 = 2;
const EXT_ARRAY: u8 = 4;

// Largest length the 3-byte length extension can describe
const MAX_LENGTH: usize = 65821 + 0xFF_FFFF;

/// Field-name tokens present in every database
pub(crate) const BASE_TOKENS: [&str; 4] = ["country", "en", "iso_code", "names"];

/// Additional field-name tokens used by the city schema
pub(crate) const CITY_TOKENS: [&str; 7] = [
    "city",
    "code",
    "latitude",
    "location",
    "longitude",
    "postal",
    "subdivisions",
];

/// Encoded data section plus the payload-key → offset table
#[derive(Debug)]
pub struct DataSection {
    bytes: Vec<u8>,
    payload_offsets: BTreeMap<String, u32>,
}

impl DataSection {
    /// Encode the complete data section
    ///
    /// `tokens` must contain every string any payload references (the
    /// builder guarantees this by collecting them from the same payloads).
    pub fn encode(
        tokens: &BTreeSet<String>,
        latlongs: &BTreeSet<String>,
        payloads: &BTreeMap<String, GeoPayload>,
    ) -> Result<DataSection> {
        let mut w = SectionWriter {
            buf: Vec::new(),
            tokens: BTreeMap::new(),
            latlongs: BTreeMap::new(),
        };

        for token in tokens {
            let offset = w.offset()?;
            write_string(token, &mut w.buf)?;
            w.tokens.insert(token.clone(), offset);
        }

        for raw in latlongs {
            let value: f64 = raw.parse().map_err(|_| {
                BuildError::Input(format!("coordinate {:?} is not a number", raw))
            })?;
            let offset = w.offset()?;
            write_double(value, &mut w.buf);
            w.latlongs.insert(raw.clone(), offset);
        }

        let mut payload_offsets = BTreeMap::new();
        for (key, payload) in payloads {
            let offset = w.write_payload(payload)?;
            payload_offsets.insert(key.clone(), offset);
        }

        Ok(DataSection {
            bytes: w.buf,
            payload_offsets,
        })
    }

    /// Encoded bytes of the section
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Section length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the section is empty (no tokens, doubles, or payloads)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset of a payload's top-level map within the section
    pub fn payload_offset(&self, key: &str) -> Option<u32> {
        self.payload_offsets.get(key).copied()
    }

    /// Number of encoded payload records
    pub fn payload_count(&self) -> usize {
        self.payload_offsets.len()
    }
}

struct SectionWriter {
    buf: Vec<u8>,
    tokens: BTreeMap<String, u32>,
    latlongs: BTreeMap<String, u32>,
}

impl SectionWriter {
    fn offset(&self) -> Result<u32> {
        u32::try_from(self.buf.len())
            .map_err(|_| BuildError::Encoding("data section exceeds 2^32 bytes".to_string()))
    }

    fn token_pointer(&mut self, key: &str) -> Result<()> {
        let offset = *self
            .tokens
            .get(key)
            .ok_or_else(|| BuildError::Encoding(format!("token {:?} missing from table", key)))?;
        write_pointer(offset, &mut self.buf);
        Ok(())
    }

    fn double_pointer(&mut self, key: &str) -> Result<()> {
        let offset = *self.latlongs.get(key).ok_or_else(|| {
            BuildError::Encoding(format!("coordinate {:?} missing from table", key))
        })?;
        write_pointer(offset, &mut self.buf);
        Ok(())
    }

    /// Emit one payload map and return its offset
    fn write_payload(&mut self, payload: &GeoPayload) -> Result<u32> {
        let offset = self.offset()?;
        match payload {
            GeoPayload::Country {
                iso_code,
                country_name,
            } => {
                write_control(TYPE_MAP, 1, &mut self.buf)?;
                self.token_pointer("country")?;
                self.write_country_map(iso_code, country_name)?;
            }
            GeoPayload::City {
                iso_code,
                country_name,
                region,
                city,
                latitude,
                longitude,
                postal_code,
            } => {
                write_control(TYPE_MAP, 5, &mut self.buf)?;

                self.token_pointer("city")?;
                write_control(TYPE_MAP, 1, &mut self.buf)?;
                self.write_names_map(city)?;

                self.token_pointer("country")?;
                self.write_country_map(iso_code, country_name)?;

                self.token_pointer("location")?;
                write_control(TYPE_MAP, 2, &mut self.buf)?;
                self.token_pointer("latitude")?;
                self.double_pointer(latitude)?;
                self.token_pointer("longitude")?;
                self.double_pointer(longitude)?;

                self.token_pointer("postal")?;
                write_control(TYPE_MAP, 1, &mut self.buf)?;
                self.token_pointer("code")?;
                self.token_pointer(postal_code)?;

                self.token_pointer("subdivisions")?;
                write_array_header(1, &mut self.buf)?;
                write_control(TYPE_MAP, 1, &mut self.buf)?;
                self.write_names_map(region)?;
            }
        }
        Ok(offset)
    }

    // { iso_code: <ptr>, names: { en: <ptr> } }
    fn write_country_map(&mut self, iso_code: &str, country_name: &str) -> Result<()> {
        write_control(TYPE_MAP, 2, &mut self.buf)?;
        self.token_pointer("iso_code")?;
        self.token_pointer(iso_code)?;
        self.write_names_map(country_name)
    }

    // names: { en: <ptr> }, the surrounding map header already written
    fn write_names_map(&mut self, name: &str) -> Result<()> {
        self.token_pointer("names")?;
        write_control(TYPE_MAP, 1, &mut self.buf)?;
        self.token_pointer("en")?;
        self.token_pointer(name)
    }
}

/// Value of a metadata entry
///
/// Integers pick the smallest unsigned type that fits via [`DataValue::uint`].
/// Strings encode inline: the metadata map sits after the data section and
/// must stay self-contained.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// UTF-8 string
    String(String),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Key-value map (string keys per the MMDB spec)
    Map(BTreeMap<String, DataValue>),
    /// Array of values
    Array(Vec<DataValue>),
}

impl DataValue {
    /// Smallest unsigned variant that holds `n`
    pub fn uint(n: u64) -> DataValue {
        if n <= u16::MAX as u64 {
            DataValue::Uint16(n as u16)
        } else if n <= u32::MAX as u64 {
            DataValue::Uint32(n as u32)
        } else {
            DataValue::Uint64(n)
        }
    }

    /// Append this value's MMDB encoding to `buf`
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            DataValue::String(s) => write_string(s, buf),
            DataValue::Uint16(n) => {
                write_uint16(*n, buf);
                Ok(())
            }
            DataValue::Uint32(n) => {
                write_uint32(*n, buf);
                Ok(())
            }
            DataValue::Uint64(n) => {
                write_uint64(*n, buf);
                Ok(())
            }
            DataValue::Map(m) => {
                write_control(TYPE_MAP, m.len(), buf)?;
                for (key, value) in m {
                    write_string(key, buf)?;
                    value.write(buf)?;
                }
                Ok(())
            }
            DataValue::Array(a) => {
                write_array_header(a.len(), buf)?;
                for value in a {
                    value.write(buf)?;
                }
                Ok(())
            }
        }
    }
}

/// Control byte with size, extending into 1/2/3 length bytes as needed
fn write_control(type_id: u8, size: usize, buf: &mut Vec<u8>) -> Result<()> {
    let type_bits = type_id << 5;

    if size < 29 {
        buf.push(type_bits | (size as u8));
    } else if size < 285 {
        buf.push(type_bits | 29);
        buf.push((size - 29) as u8);
    } else if size < 65821 {
        buf.push(type_bits | 30);
        buf.extend_from_slice(&((size - 285) as u16).to_be_bytes());
    } else if size <= MAX_LENGTH {
        buf.push(type_bits | 31);
        buf.extend_from_slice(&((size - 65821) as u32).to_be_bytes()[1..]);
    } else {
        return Err(BuildError::Encoding(format!(
            "length {} exceeds the control-byte extension range",
            size
        )));
    }
    Ok(())
}

// Type 2: String (UTF-8)
fn write_string(s: &str, buf: &mut Vec<u8>) -> Result<()> {
    let bytes = s.as_bytes();
    write_control(TYPE_STRING, bytes.len(), buf)?;
    buf.extend_from_slice(bytes);
    Ok(())
}

// Type 3: Double (IEEE 754, 64-bit, big-endian)
fn write_double(d: f64, buf: &mut Vec<u8>) {
    buf.push((TYPE_DOUBLE << 5) | 8);
    buf.extend_from_slice(&d.to_be_bytes());
}

// Type 1: Pointer, four size classes by target offset
fn write_pointer(offset: u32, buf: &mut Vec<u8>) {
    if offset < 2048 {
        buf.push((TYPE_POINTER << 5) | ((offset >> 8) as u8));
        buf.push((offset & 0xFF) as u8);
    } else if offset < 526_336 {
        let adjusted = offset - 2048;
        buf.push((TYPE_POINTER << 5) | (1 << 3) | ((adjusted >> 16) as u8));
        buf.extend_from_slice(&(adjusted as u16).to_be_bytes());
    } else if offset < 134_217_728 {
        let adjusted = offset - 526_336;
        buf.push((TYPE_POINTER << 5) | (2 << 3) | ((adjusted >> 24) as u8));
        buf.extend_from_slice(&adjusted.to_be_bytes()[1..]);
    } else {
        buf.push((TYPE_POINTER << 5) | (3 << 3));
        buf.extend_from_slice(&offset.to_be_bytes());
    }
}

// Type 5: Uint16, one payload byte when the value allows
fn write_uint16(n: u16, buf: &mut Vec<u8>) {
    if n < 256 {
        buf.push((TYPE_UINT16 << 5) | 1);
        buf.push(n as u8);
    } else {
        buf.push((TYPE_UINT16 << 5) | 2);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

// Type 6: Uint32
fn write_uint32(n: u32, buf: &mut Vec<u8>) {
    buf.push((TYPE_UINT32 << 5) | 4);
    buf.extend_from_slice(&n.to_be_bytes());
}

// Type 9: Uint64 (extended type 2)
fn write_uint64(n: u64, buf: &mut Vec<u8>) {
    buf.push(8); // type 0, size 8
    buf.push(EXT_UINT64);
    buf.extend_from_slice(&n.to_be_bytes());
}

// Type 11: Array (extended type 4)
fn write_array_header(len: usize, buf: &mut Vec<u8>) -> Result<()> {
    write_control(0, len, buf)?;
    buf.push(EXT_ARRAY);
    Ok(())
}
