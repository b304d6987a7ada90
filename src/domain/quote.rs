//! Quote assembly: product cost, insurance, duty and margin on top of the freight bundle.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cost_engine::CostEngine;
use super::entities::{
    checked_add, checked_mul, checked_sum, CostBundle, CostContext, CostLineItem, RateOrigins,
    ResolvedRates, RouteSpec, TransitLegs, TransitWindow,
};
use super::error::ValidationError;
use super::incoterms::{Incoterm, IncotermAllocator, IncotermGroup, LineCategory};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSettings {
    /// Cargo insurance premium as a fraction of the insured value.
    pub insurance_rate: Decimal,
    /// Units packed per TEU when pricing from a local unit price.
    pub units_per_teu: u32,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            insurance_rate: dec!(0.003),
            units_per_teu: 20_000,
        }
    }
}

impl QuoteSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.insurance_rate < Decimal::ZERO || self.insurance_rate > Decimal::ONE {
            return Err(ValidationError::InvalidConfig(format!(
                "insurance_rate must be within [0, 1] (got {})",
                self.insurance_rate
            )));
        }
        if self.units_per_teu == 0 {
            return Err(ValidationError::NotPositive {
                field: "units_per_teu",
                value: Decimal::ZERO,
            });
        }
        Ok(())
    }
}

/// How the goods themselves are priced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductCost {
    /// Total manufacturing cost of the shipment in USD.
    Usd(Decimal),
    /// Ex-factory price per unit in local currency.
    LocalUnitPrice {
        unit_price: Decimal,
        units_per_teu: Option<u32>,
    },
}

impl ProductCost {
    pub fn to_usd(
        &self,
        teu_count: u32,
        exchange_rate: Decimal,
        default_units_per_teu: u32,
    ) -> Result<Decimal, ValidationError> {
        match self {
            Self::Usd(amount) => {
                if *amount < Decimal::ZERO {
                    return Err(ValidationError::NegativeAmount {
                        field: "mfg_cost",
                        value: *amount,
                    });
                }
                Ok(*amount)
            }
            Self::LocalUnitPrice {
                unit_price,
                units_per_teu,
            } => {
                if *unit_price < Decimal::ZERO {
                    return Err(ValidationError::NegativeAmount {
                        field: "unit_price",
                        value: *unit_price,
                    });
                }
                let units = units_per_teu.unwrap_or(default_units_per_teu);
                if units == 0 {
                    return Err(ValidationError::NotPositive {
                        field: "units_per_teu",
                        value: Decimal::ZERO,
                    });
                }
                let per_teu = checked_mul("product_cost", *unit_price, Decimal::from(units))?;
                let local_total = checked_mul("product_cost", per_teu, Decimal::from(teu_count))?;
                local_total
                    .checked_div(exchange_rate)
                    .ok_or(ValidationError::Overflow {
                        field: "product_cost",
                    })
            }
        }
    }
}

/// Combines a freight bundle with the goods value into the full cost context.
///
/// Insurance covers the CFR value (goods plus ocean freight). Duty is levied
/// on the value at the border: goods, ocean, rail and insurance. The margin
/// applies to goods plus all freight components.
pub fn cost_context(
    bundle: &CostBundle,
    mfg_cost: Decimal,
    insurance_rate: Decimal,
    duty_rate: Decimal,
) -> Result<CostContext, ValidationError> {
    let cfr_value = checked_add("insurance", mfg_cost, bundle.ocean_cost)?;
    let insurance = checked_mul("insurance", insurance_rate, cfr_value)?;
    let dutiable_value = checked_sum(
        "duty",
        [mfg_cost, bundle.ocean_cost, bundle.rail_cost, insurance],
    )?;
    let margin_base = checked_add("margin", mfg_cost, bundle.logistics_total()?)?;

    Ok(CostContext {
        mfg_cost,
        inland: bundle.inland_kr_cost,
        thc: bundle.thc_cost,
        ocean: bundle.ocean_cost,
        rail: bundle.rail_cost,
        insurance,
        duty: checked_mul("duty", duty_rate, dutiable_value)?,
        margin: checked_mul("margin", bundle.margin_rate, margin_base)?,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SellerRisk {
    pub score: u8,
    pub level: RiskLevel,
}

/// How much of the journey's risk sits with the seller, on a 0-100 gauge.
pub fn seller_risk(group: IncotermGroup) -> SellerRisk {
    let score = match group {
        IncotermGroup::Departure => 10,
        IncotermGroup::MainCarriageUnpaid => 30,
        IncotermGroup::MainCarriagePaid => 60,
        IncotermGroup::Arrival => 90,
    };
    let level = if score >= 70 {
        RiskLevel::High
    } else if score >= 40 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    SellerRisk { score, level }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteRequest {
    pub route: RouteSpec,
    pub incoterm: Incoterm,
    pub product: ProductCost,
}

#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    pub id: Uuid,
    pub incoterm: Incoterm,
    pub group: IncotermGroup,
    pub destination: String,
    pub teu_count: u32,
    pub transit: TransitLegs,
    /// Door-to-door window: ocean, inland and rail legs added up.
    pub transit_days: TransitWindow,
    pub bundle: CostBundle,
    pub context: CostContext,
    pub line_items: Vec<CostLineItem>,
    pub product_cost: Decimal,
    /// Seller-borne cost excluding the goods themselves.
    pub logistics_total: Decimal,
    pub final_quote: Decimal,
    pub final_quote_local: Decimal,
    pub logistics_share_pct: Decimal,
    pub seller_risk: SellerRisk,
    pub rate_origins: RateOrigins,
    pub degraded_rates: bool,
}

#[derive(Clone, Debug)]
pub struct Quoter {
    engine: CostEngine,
    allocator: IncotermAllocator,
    settings: QuoteSettings,
}

impl Quoter {
    pub fn new(engine: CostEngine, allocator: IncotermAllocator, settings: QuoteSettings) -> Self {
        Self {
            engine,
            allocator,
            settings,
        }
    }

    pub fn engine(&self) -> &CostEngine {
        &self.engine
    }

    pub fn allocator(&self) -> &IncotermAllocator {
        &self.allocator
    }

    pub fn quote(
        &self,
        request: &QuoteRequest,
        resolved: &ResolvedRates,
    ) -> Result<Quote, ValidationError> {
        let route = &request.route;
        let rates = &resolved.rates;
        let profile = self.engine.destination(route.destination())?;
        let bundle = self.engine.compute(route, rates)?;
        let transit = self.engine.transit(route.destination())?;

        let product_cost = request.product.to_usd(
            route.teu_count(),
            rates.exchange_rate(),
            self.settings.units_per_teu,
        )?;
        let context = cost_context(
            &bundle,
            product_cost,
            self.settings.insurance_rate,
            profile.duty_rate,
        )?;
        let line_items = self.allocator.allocate(request.incoterm, &context)?;

        let final_quote = checked_sum("final_quote", line_items.iter().map(|item| item.amount))?;
        let logistics_total = checked_sum(
            "logistics_total",
            line_items
                .iter()
                .filter(|item| item.category != LineCategory::ProductCost)
                .map(|item| item.amount),
        )?;
        // Every amount is non-negative, so the share never exceeds 100.
        let logistics_share_pct = if final_quote > Decimal::ZERO {
            checked_mul("logistics_share_pct", logistics_total / final_quote, dec!(100))?
        } else {
            Decimal::ZERO
        };
        let final_quote_local =
            checked_mul("final_quote_local", final_quote, rates.exchange_rate())?;

        let quote = Quote {
            id: Uuid::new_v4(),
            incoterm: request.incoterm,
            group: request.incoterm.group(),
            destination: profile.name.clone(),
            teu_count: route.teu_count(),
            transit,
            transit_days: transit.total(),
            bundle,
            context,
            line_items,
            product_cost,
            logistics_total,
            final_quote,
            final_quote_local,
            logistics_share_pct,
            seller_risk: seller_risk(request.incoterm.group()),
            rate_origins: resolved.origins,
            degraded_rates: resolved.is_degraded(),
        };

        tracing::info!(
            quote_id = %quote.id,
            incoterm = %quote.incoterm,
            destination = %quote.destination,
            teu = quote.teu_count,
            final_quote = %quote.final_quote.round_dp(2),
            transit = %quote.transit_days,
            degraded_rates = quote.degraded_rates,
            "quote assembled"
        );

        Ok(quote)
    }
}

impl Default for Quoter {
    fn default() -> Self {
        Self::new(
            CostEngine::default(),
            IncotermAllocator::default(),
            QuoteSettings::default(),
        )
    }
}
