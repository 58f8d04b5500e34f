// Airline directory: the code -> airline lookup table built once at startup
// from the OpenFlights airline table

use crate::supplier::{AirlineSource, SourceError};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

// Positions in an OpenFlights airlines.dat row
const NAME_FIELD: usize = 1;
const IATA_FIELD: usize = 3;
const COUNTRY_FIELD: usize = 6;
const ACTIVE_FIELD: usize = 7;
const MIN_FIELDS: usize = 8;

// OpenFlights null marker
const NULL_FIELD: &str = "\\N";

pub const UNKNOWN_AIRLINE_NAME: &str = "unknown airline";

// Hand-curated Traditional Chinese names, keyed by IATA code
pub const LOCALIZED_NAMES: &[(&str, &str)] = &[
    ("BR", "長榮航空"),
    ("CI", "中華航空"),
    ("JL", "日本航空"),
    ("NH", "全日空"),
    ("UA", "美國聯合航空"),
    ("DL", "達美航空"),
    ("AA", "美國航空"),
    ("TR", "酷航"),
    ("SL", "泰國獅子航空"),
    ("KE", "大韓航空"),
    ("OZ", "韓亞航空"),
    ("CX", "國泰航空"),
    ("SQ", "新加坡航空"),
];

pub fn localized_name(code: &str) -> &'static str {
    LOCALIZED_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or("", |(_, name)| *name)
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Airline source unavailable: {0}")]
    SourceUnavailable(String),
}

impl From<SourceError> for DirectoryError {
    fn from(err: SourceError) -> Self {
        DirectoryError::SourceUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineRecord {
    pub code: String,
    pub name_english: String,
    pub name_localized: String,
    pub country: String,
}

impl AirlineRecord {
    // Stand-in joined onto offers whose code is not in the directory
    pub fn unknown() -> Self {
        Self {
            code: String::new(),
            name_english: UNKNOWN_AIRLINE_NAME.to_string(),
            name_localized: String::new(),
            country: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct AirlineDirectory {
    entries: HashMap<String, AirlineRecord>,
    unknown: AirlineRecord,
}

impl AirlineDirectory {
    pub async fn build(source: &dyn AirlineSource) -> Result<Self, DirectoryError> {
        let table = source.fetch_airlines().await?;
        let directory = Self::from_reader(&table[..])?;

        info!(airlines = directory.len(), "airline directory built");
        Ok(directory)
    }

    // Parses a headerless airlines.dat table, keeping active airlines that
    // have an IATA code. Later rows win on duplicate codes. Fields are
    // decoded leniently; invalid UTF-8 becomes U+FFFD.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, DirectoryError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = HashMap::new();
        let mut rows = 0usize;

        for result in reader.byte_records() {
            let row = result.map_err(|e| {
                DirectoryError::SourceUnavailable(format!("malformed airline table: {}", e))
            })?;
            rows += 1;

            if row.len() < MIN_FIELDS {
                continue;
            }

            let field = |index: usize| String::from_utf8_lossy(&row[index]);

            let code = field(IATA_FIELD);
            if code.is_empty() || code == NULL_FIELD || &row[ACTIVE_FIELD] != b"Y" {
                continue;
            }

            entries.insert(
                code.to_string(),
                AirlineRecord {
                    code: code.to_string(),
                    name_english: field(NAME_FIELD).into_owned(),
                    name_localized: localized_name(&code).to_string(),
                    country: field(COUNTRY_FIELD).into_owned(),
                },
            );
        }

        if entries.is_empty() {
            warn!(rows, "airline table produced an empty directory");
        }

        Ok(Self {
            entries,
            unknown: AirlineRecord::unknown(),
        })
    }

    pub fn from_records(records: impl IntoIterator<Item = AirlineRecord>) -> Self {
        Self {
            entries: records
                .into_iter()
                .map(|record| (record.code.clone(), record))
                .collect(),
            unknown: AirlineRecord::unknown(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&AirlineRecord> {
        self.entries.get(code)
    }

    // Left-join lookup: never misses, falls back to the unknown airline
    pub fn lookup(&self, code: &str) -> &AirlineRecord {
        self.entries.get(code).unwrap_or(&self.unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AirlineRecord> {
        self.entries.values()
    }
}
