// Flight offers: the raw shape returned by the pricing source, the display
// shape handed back to callers, and the per-offer evaluation between them

use crate::airline::AirlineDirectory;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// Departures before this local hour are red-eye flights
pub const RED_EYE_END_HOUR: u32 = 6;

// Marker preceding the airline code inside an offer link
pub const AIRLINE_CODE_MARKER: &str = "t=";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOffer {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub price: f64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub flight_number: String,
    pub departure_at: String,
    #[serde(default)]
    pub link: String,
}

// Flight numbers arrive as either "7351" or 7351
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "unexpected flight number: {}",
            other
        ))),
    }
}

// Prices arrive as 5000, 5000.5 or "5000"
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("unrepresentable price: {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("non-numeric price: {:?}", s))),
        other => Err(D::Error::custom(format!("unexpected price: {}", other))),
    }
}

// A departure timestamp: local wall-clock time plus the UTC offset when the
// source supplied one. Serializes back in ISO-8601 with that offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl Departure {
    pub fn parse(raw: &str) -> Option<Self> {
        let with_offset = DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"));
        if let Ok(dt) = with_offset {
            return Some(Self {
                local: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(Self::from)
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }
}

impl From<NaiveDateTime> for Departure {
    fn from(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            write!(f, "{}", offset)?;
        }
        Ok(())
    }
}

impl Serialize for Departure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayOffer {
    pub price: f64,
    pub flight_number: String,
    pub departure_at: Departure,
    pub airline_name_english: String,
    pub airline_name_localized: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Malformed(String),
    InvalidTimestamp(String),
    RedEye { hour: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OfferOutcome {
    Keep(DisplayOffer),
    Skip(SkipReason),
}

pub fn is_red_eye(departure: &Departure) -> bool {
    departure.hour() < RED_EYE_END_HOUR
}

// Two-character airline code following the first "t=" in the link, cut
// short if another "t=" begins first. Empty when the marker is absent.
pub fn airline_code_from_link(link: &str) -> &str {
    let Some((_, rest)) = link.split_once(AIRLINE_CODE_MARKER) else {
        return "";
    };
    let token = rest.split(AIRLINE_CODE_MARKER).next().unwrap_or(rest);

    match token.char_indices().nth(2) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}

impl RawOffer {
    pub fn evaluate(&self, directory: &AirlineDirectory) -> OfferOutcome {
        let Some(departure_at) = Departure::parse(&self.departure_at) else {
            return OfferOutcome::Skip(SkipReason::InvalidTimestamp(self.departure_at.clone()));
        };

        if is_red_eye(&departure_at) {
            return OfferOutcome::Skip(SkipReason::RedEye {
                hour: departure_at.hour(),
            });
        }

        let airline = directory.lookup(airline_code_from_link(&self.link));

        OfferOutcome::Keep(DisplayOffer {
            price: self.price,
            flight_number: self.flight_number.clone(),
            departure_at,
            airline_name_english: airline.name_english.clone(),
            airline_name_localized: airline.name_localized.clone(),
        })
    }
}

pub fn evaluate_offer(raw: &serde_json::Value, directory: &AirlineDirectory) -> OfferOutcome {
    match RawOffer::deserialize(raw) {
        Ok(offer) => offer.evaluate(directory),
        Err(e) => OfferOutcome::Skip(SkipReason::Malformed(e.to_string())),
    }
}
