//! Freight cost calculation for the Korea → China → Central Asia corridor.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::entities::{
    checked_mul, CostBundle, DestinationProfile, RateSet, RouteSpec, TransitLegs, TransitWindow,
};
use super::error::ValidationError;

/// Multipliers applied to the base freight rates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surcharges {
    /// Bunker adjustment factor, applied to ocean and rail.
    pub baf: Decimal,
    /// Currency adjustment factor, ocean only.
    pub caf: Decimal,
    /// Peak season surcharge, ocean only.
    pub pss: Decimal,
}

impl Default for Surcharges {
    fn default() -> Self {
        Self {
            baf: dec!(1.10),
            caf: dec!(1.05),
            pss: dec!(1.15),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostEngineConfig {
    pub surcharges: Surcharges,
    /// Korean inland trucking per TEU, USD.
    pub inland_fee_per_teu: Decimal,
    /// Terminal handling per TEU, USD.
    pub thc_fee_per_teu: Decimal,
    /// Incheon → Lianyungang sea leg.
    pub ocean_transit: TransitWindow,
    /// Trucking from the factory to the port.
    pub inland_transit: TransitWindow,
    pub destinations: Vec<DestinationProfile>,
}

impl Default for CostEngineConfig {
    fn default() -> Self {
        Self {
            surcharges: Surcharges::default(),
            inland_fee_per_teu: dec!(400),
            thc_fee_per_teu: dec!(150),
            ocean_transit: TransitWindow::new(3, 4),
            inland_transit: TransitWindow::new(1, 1),
            destinations: vec![
                DestinationProfile::new("Mongolia", 1800, TransitWindow::new(5, 7), dec!(0.08)),
                DestinationProfile::new(
                    "Kazakhstan",
                    4500,
                    TransitWindow::new(12, 15),
                    dec!(0.08),
                ),
            ],
        }
    }
}

impl CostEngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let factors = [
            ("baf", self.surcharges.baf),
            ("caf", self.surcharges.caf),
            ("pss", self.surcharges.pss),
        ];
        for (field, value) in factors {
            if value <= Decimal::ZERO {
                return Err(ValidationError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("inland_fee_per_teu", self.inland_fee_per_teu),
            ("thc_fee_per_teu", self.thc_fee_per_teu),
        ] {
            if value < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount { field, value });
            }
        }

        self.ocean_transit.validate("ocean")?;
        self.inland_transit.validate("inland")?;

        if self.destinations.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "at least one destination must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            if !seen.insert(destination.name.as_str()) {
                return Err(ValidationError::InvalidConfig(format!(
                    "destination {} is configured twice",
                    destination.name
                )));
            }
            if destination.rail_distance_km == 0 {
                return Err(ValidationError::InvalidConfig(format!(
                    "destination {} has no rail distance",
                    destination.name
                )));
            }
            destination.rail_transit.validate(&destination.name)?;
            if destination.duty_rate < Decimal::ZERO || destination.duty_rate > Decimal::ONE {
                return Err(ValidationError::InvalidConfig(format!(
                    "destination {} duty rate must be within [0, 1] (got {})",
                    destination.name, destination.duty_rate
                )));
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CostEngine {
    surcharges: Surcharges,
    inland_fee_per_teu: Decimal,
    thc_fee_per_teu: Decimal,
    ocean_transit: TransitWindow,
    inland_transit: TransitWindow,
    destinations: BTreeMap<String, DestinationProfile>,
}

impl Default for CostEngine {
    fn default() -> Self {
        Self::new(CostEngineConfig::default())
    }
}

impl CostEngine {
    pub fn new(config: CostEngineConfig) -> Self {
        let destinations = config
            .destinations
            .into_iter()
            .map(|profile| (profile.name.clone(), profile))
            .collect();
        Self {
            surcharges: config.surcharges,
            inland_fee_per_teu: config.inland_fee_per_teu,
            thc_fee_per_teu: config.thc_fee_per_teu,
            ocean_transit: config.ocean_transit,
            inland_transit: config.inland_transit,
            destinations,
        }
    }

    pub fn destination(&self, name: &str) -> Result<&DestinationProfile, ValidationError> {
        self.destinations
            .get(name)
            .ok_or_else(|| ValidationError::UnknownDestination(name.to_string()))
    }

    pub fn destinations(&self) -> impl Iterator<Item = &DestinationProfile> {
        self.destinations.values()
    }

    /// Transit time of each leg towards `destination`.
    pub fn transit(&self, destination: &str) -> Result<TransitLegs, ValidationError> {
        let profile = self.destination(destination)?;
        Ok(TransitLegs {
            ocean: self.ocean_transit,
            inland: self.inland_transit,
            rail: profile.rail_transit,
        })
    }

    pub fn compute(
        &self,
        route: &RouteSpec,
        rates: &RateSet,
    ) -> Result<CostBundle, ValidationError> {
        if route.teu_count() < 1 {
            return Err(ValidationError::NonPositiveTeu);
        }
        let profile = self.destination(route.destination())?;
        let teus = Decimal::from(route.teu_count());
        let distance = Decimal::from(profile.rail_distance_km);
        let Surcharges { baf, caf, pss } = self.surcharges;

        let ocean_cost = [baf, caf, pss, teus]
            .into_iter()
            .try_fold(rates.ocean_rate_per_teu(), |acc, factor| {
                checked_mul("ocean_cost", acc, factor)
            })?;
        let rail_cost = [rates.rail_rate_per_km(), baf, teus]
            .into_iter()
            .try_fold(distance, |acc, factor| checked_mul("rail_cost", acc, factor))?;

        let bundle = CostBundle {
            ocean_cost,
            rail_cost,
            inland_kr_cost: checked_mul("inland_kr_cost", self.inland_fee_per_teu, teus)?,
            thc_cost: checked_mul("thc_cost", self.thc_fee_per_teu, teus)?,
            margin_rate: rates.margin_rate(),
            exchange_rate: rates.exchange_rate(),
            rail_distance_km: profile.rail_distance_km,
        };

        tracing::debug!(
            destination = %profile.name,
            teu = route.teu_count(),
            ocean = %bundle.ocean_cost,
            rail = %bundle.rail_cost,
            "computed cost bundle"
        );

        bundle.logistics_total()?;
        Ok(bundle)
    }
}
