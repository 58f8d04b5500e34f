// Main library file for the fare finder service

pub mod airline;
pub mod config;
pub mod http;
pub mod offer;
pub mod resolver;
pub mod supplier;

// Re-export key types for convenience
pub use airline::{AirlineDirectory, AirlineRecord, DirectoryError};
pub use config::{AppConfig, ConfigError};
pub use http::{create_router, AppState};
pub use offer::{Departure, DisplayOffer, OfferOutcome, RawOffer, SkipReason};
pub use resolver::{resolve_offers, FlightOfferResolver, Resolution};
pub use supplier::{
    AirlineSource, OpenFlightsClient, PriceQuery, PricingSource, SourceError, TravelpayoutsClient,
};
