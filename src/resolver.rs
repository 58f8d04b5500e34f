// Flight offer resolver: one pricing call per search, then evaluate each
// offer against the airline directory

use crate::airline::AirlineDirectory;
use crate::offer::{evaluate_offer, DisplayOffer, OfferOutcome, SkipReason};
use crate::supplier::{PriceQuery, PricingSource, SourceError};
use std::sync::Arc;
use tracing::{debug, info};

// Kept offers in source order, plus why the others were dropped
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    pub offers: Vec<DisplayOffer>,
    pub skipped: Vec<SkipReason>,
}

pub fn resolve_offers(raw: &[serde_json::Value], directory: &AirlineDirectory) -> Resolution {
    let mut resolution = Resolution::default();

    for value in raw {
        match evaluate_offer(value, directory) {
            OfferOutcome::Keep(offer) => resolution.offers.push(offer),
            OfferOutcome::Skip(reason) => {
                debug!(?reason, "skipping offer");
                resolution.skipped.push(reason);
            }
        }
    }

    resolution
}

pub struct FlightOfferResolver {
    source: Arc<dyn PricingSource>,
    directory: Arc<AirlineDirectory>,
    currency: String,
}

impl FlightOfferResolver {
    pub fn new(
        source: Arc<dyn PricingSource>,
        directory: Arc<AirlineDirectory>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            source,
            directory,
            currency: currency.into(),
        }
    }

    // Airports are expected non-empty and upper-cased; the month goes to the
    // pricing source untouched. A failed pricing call fails the whole search.
    pub async fn resolve(
        &self,
        origin: &str,
        destination: &str,
        month: &str,
    ) -> Result<Vec<DisplayOffer>, SourceError> {
        Ok(self
            .resolve_detailed(origin, destination, month)
            .await?
            .offers)
    }

    pub async fn resolve_detailed(
        &self,
        origin: &str,
        destination: &str,
        month: &str,
    ) -> Result<Resolution, SourceError> {
        let query = PriceQuery {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_at: month.to_string(),
            currency: self.currency.clone(),
        };

        let raw = self.source.prices_for_dates(&query).await?;
        let resolution = resolve_offers(&raw, &self.directory);

        info!(
            origin,
            destination,
            month,
            received = raw.len(),
            kept = resolution.offers.len(),
            skipped = resolution.skipped.len(),
            "resolved offers"
        );

        Ok(resolution)
    }
}
