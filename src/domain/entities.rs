use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use time::Date;

use super::error::ValidationError;
use super::incoterms::LineCategory;

pub const DEFAULT_OCEAN_RATE_PER_TEU: Decimal = dec!(1481);
pub const DEFAULT_RAIL_RATE_PER_KM: Decimal = dec!(0.75);
pub const DEFAULT_MARGIN_RATE: Decimal = dec!(0.045);
pub const DEFAULT_EXCHANGE_RATE: Decimal = dec!(1380);

/// Unit economics for one calculation. Every field is strictly positive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RateSetFields")]
pub struct RateSet {
    ocean_rate_per_teu: Decimal,
    rail_rate_per_km: Decimal,
    margin_rate: Decimal,
    exchange_rate: Decimal,
}

impl RateSet {
    pub fn new(
        ocean_rate_per_teu: Decimal,
        rail_rate_per_km: Decimal,
        margin_rate: Decimal,
        exchange_rate: Decimal,
    ) -> Result<Self, ValidationError> {
        ensure_positive("ocean_rate_per_teu", ocean_rate_per_teu)?;
        ensure_positive("rail_rate_per_km", rail_rate_per_km)?;
        ensure_positive("margin_rate", margin_rate)?;
        ensure_positive("exchange_rate", exchange_rate)?;
        Ok(Self {
            ocean_rate_per_teu,
            rail_rate_per_km,
            margin_rate,
            exchange_rate,
        })
    }

    /// USD per TEU for the ocean leg, before surcharges.
    pub fn ocean_rate_per_teu(&self) -> Decimal {
        self.ocean_rate_per_teu
    }

    /// USD per kilometre for the rail leg, before surcharges.
    pub fn rail_rate_per_km(&self) -> Decimal {
        self.rail_rate_per_km
    }

    /// Forwarder margin as a fraction (0.045 = 4.5%).
    pub fn margin_rate(&self) -> Decimal {
        self.margin_rate
    }

    /// Local currency units per USD.
    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }
}

impl Default for RateSet {
    fn default() -> Self {
        Self {
            ocean_rate_per_teu: DEFAULT_OCEAN_RATE_PER_TEU,
            rail_rate_per_km: DEFAULT_RAIL_RATE_PER_KM,
            margin_rate: DEFAULT_MARGIN_RATE,
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RateSetFields {
    ocean_rate_per_teu: Decimal,
    rail_rate_per_km: Decimal,
    margin_rate: Decimal,
    exchange_rate: Decimal,
}

impl Default for RateSetFields {
    fn default() -> Self {
        Self {
            ocean_rate_per_teu: DEFAULT_OCEAN_RATE_PER_TEU,
            rail_rate_per_km: DEFAULT_RAIL_RATE_PER_KM,
            margin_rate: DEFAULT_MARGIN_RATE,
            exchange_rate: DEFAULT_EXCHANGE_RATE,
        }
    }
}

impl TryFrom<RateSetFields> for RateSet {
    type Error = ValidationError;

    fn try_from(fields: RateSetFields) -> Result<Self, Self::Error> {
        RateSet::new(
            fields.ocean_rate_per_teu,
            fields.rail_rate_per_km,
            fields.margin_rate,
            fields.exchange_rate,
        )
    }
}

/// Where a resolved rate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrigin {
    RateTable,
    LiveFeed,
    Default,
}

impl RateOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RateTable => "rate table",
            Self::LiveFeed => "live feed",
            Self::Default => "default",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOrigins {
    pub ocean_rate_per_teu: RateOrigin,
    pub rail_rate_per_km: RateOrigin,
    pub margin_rate: RateOrigin,
    pub exchange_rate: RateOrigin,
}

impl RateOrigins {
    pub fn all_default() -> Self {
        Self {
            ocean_rate_per_teu: RateOrigin::Default,
            rail_rate_per_km: RateOrigin::Default,
            margin_rate: RateOrigin::Default,
            exchange_rate: RateOrigin::Default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, RateOrigin)> {
        [
            ("ocean_rate_per_teu", self.ocean_rate_per_teu),
            ("rail_rate_per_km", self.rail_rate_per_km),
            ("margin_rate", self.margin_rate),
            ("exchange_rate", self.exchange_rate),
        ]
        .into_iter()
    }
}

/// A rate set together with the provenance of each field.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRates {
    pub rates: RateSet,
    pub origins: RateOrigins,
    /// Publication date of the live exchange rate, when one was used.
    pub fx_as_of: Option<Date>,
}

impl ResolvedRates {
    pub fn defaults(rates: RateSet) -> Self {
        Self {
            rates,
            origins: RateOrigins::all_default(),
            fx_as_of: None,
        }
    }

    /// True when at least one field fell back to its default value.
    pub fn is_degraded(&self) -> bool {
        self.origins.iter().any(|(_, origin)| origin.is_default())
    }
}

/// Door-to-door duration range of a leg, in whole days.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitWindow {
    pub min_days: u32,
    pub max_days: u32,
}

impl TransitWindow {
    pub const fn new(min_days: u32, max_days: u32) -> Self {
        Self { min_days, max_days }
    }

    pub fn validate(&self, leg: &str) -> Result<(), ValidationError> {
        if self.min_days > self.max_days {
            return Err(ValidationError::InvalidConfig(format!(
                "{leg} transit window {} is inverted",
                self
            )));
        }
        Ok(())
    }

    pub fn plus(self, other: TransitWindow) -> Self {
        Self {
            min_days: self.min_days.saturating_add(other.min_days),
            max_days: self.max_days.saturating_add(other.max_days),
        }
    }
}

impl fmt::Display for TransitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min_days, self.max_days) {
            (1, 1) => write!(f, "1 day"),
            (min, max) if min == max => write!(f, "{min} days"),
            (min, max) => write!(f, "{min}-{max} days"),
        }
    }
}

/// Transit time per leg of the corridor: sea to China, Korean trucking, rail onward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TransitLegs {
    pub ocean: TransitWindow,
    pub inland: TransitWindow,
    pub rail: TransitWindow,
}

impl TransitLegs {
    pub fn total(&self) -> TransitWindow {
        self.ocean.plus(self.inland).plus(self.rail)
    }
}

/// Rail distance, rail transit time and import duty for one configured destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationProfile {
    pub name: String,
    pub rail_distance_km: u32,
    pub rail_transit: TransitWindow,
    /// Import duty as a fraction of the dutiable value.
    pub duty_rate: Decimal,
}

impl DestinationProfile {
    pub fn new(
        name: impl Into<String>,
        rail_distance_km: u32,
        rail_transit: TransitWindow,
        duty_rate: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            rail_distance_km,
            rail_transit,
            duty_rate,
        }
    }
}

/// Shipment input: where to and how many containers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteSpec {
    destination: String,
    teu_count: u32,
}

impl RouteSpec {
    pub fn new(destination: impl Into<String>, teu_count: u32) -> Result<Self, ValidationError> {
        if teu_count < 1 {
            return Err(ValidationError::NonPositiveTeu);
        }
        Ok(Self {
            destination: destination.into(),
            teu_count,
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn teu_count(&self) -> u32 {
        self.teu_count
    }
}

/// Itemised shipment cost in USD. Always complete, whatever term consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CostBundle {
    pub ocean_cost: Decimal,
    pub rail_cost: Decimal,
    pub inland_kr_cost: Decimal,
    pub thc_cost: Decimal,
    pub margin_rate: Decimal,
    pub exchange_rate: Decimal,
    pub rail_distance_km: u32,
}

impl CostBundle {
    pub fn logistics_total(&self) -> Result<Decimal, ValidationError> {
        checked_sum(
            "logistics_total",
            [
                self.ocean_cost,
                self.rail_cost,
                self.inland_kr_cost,
                self.thc_cost,
            ],
        )
    }
}

/// Everything a seller could be charged for, in USD.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostContext {
    pub mfg_cost: Decimal,
    pub inland: Decimal,
    pub thc: Decimal,
    pub ocean: Decimal,
    pub rail: Decimal,
    pub insurance: Decimal,
    pub duty: Decimal,
    pub margin: Decimal,
}

impl CostContext {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("mfg_cost", self.mfg_cost),
            ("inland", self.inland),
            ("thc", self.thc),
            ("ocean", self.ocean),
            ("rail", self.rail),
            ("insurance", self.insurance),
            ("duty", self.duty),
            ("margin", self.margin),
        ];
        for (field, value) in fields {
            if value < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }
}

/// One row of the seller's cost breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CostLineItem {
    pub label: String,
    pub category: LineCategory,
    pub amount: Decimal,
}

pub(crate) fn checked_mul(
    field: &'static str,
    lhs: Decimal,
    rhs: Decimal,
) -> Result<Decimal, ValidationError> {
    lhs.checked_mul(rhs)
        .ok_or(ValidationError::Overflow { field })
}

pub(crate) fn checked_add(
    field: &'static str,
    lhs: Decimal,
    rhs: Decimal,
) -> Result<Decimal, ValidationError> {
    lhs.checked_add(rhs)
        .ok_or(ValidationError::Overflow { field })
}

pub(crate) fn checked_sum(
    field: &'static str,
    values: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ValidationError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| checked_add(field, acc, value))
}

pub(crate) fn ensure_positive(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}
