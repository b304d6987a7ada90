//! Resolves the four unit rates from the tariff sheets and the live FX feed,
//! falling back field by field to configured defaults.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{RateOrigin, RateOrigins, RateSet, ResolvedRates};
use crate::infra::fx::{FxClient, FxQuote, FxSettings};
use crate::infra::rate_tables::{default_data_dir, RateTableError, RateTableLayout, RateTables};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    /// Directory holding the tariff sheets. Defaults to the per-user data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub tables: RateTableLayout,
    pub fx: FxSettings,
    pub defaults: RateSet,
}

impl RateSettings {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

#[derive(Debug)]
pub struct RateProvider {
    defaults: RateSet,
    tables: Option<RateTables>,
    fx: Option<FxClient>,
}

impl RateProvider {
    pub fn new(defaults: RateSet) -> Self {
        Self {
            defaults,
            tables: None,
            fx: None,
        }
    }

    pub fn with_tables(mut self, tables: RateTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_fx(mut self, fx: FxClient) -> Self {
        self.fx = Some(fx);
        self
    }

    /// Wires every source the settings enable. A source that cannot be built
    /// is logged and left out.
    pub fn from_settings(settings: &RateSettings) -> Self {
        let dir = settings.data_dir();
        let tables = RateTables::load(&dir, settings.tables.clone());
        let provider = Self::new(settings.defaults.clone()).with_tables(tables);

        if !settings.fx.enabled {
            tracing::debug!("live exchange rate disabled");
            return provider;
        }
        match FxClient::new(&settings.fx) {
            Ok(client) => provider.with_fx(client),
            Err(err) => {
                tracing::warn!(error = %err, "cannot build exchange-rate client; live rate disabled");
                provider
            }
        }
    }

    pub fn defaults(&self) -> &RateSet {
        &self.defaults
    }

    /// Always returns a complete rate set.
    pub async fn resolve(&self) -> ResolvedRates {
        let defaults = &self.defaults;

        let (ocean, ocean_origin) = self.from_table(
            "ocean_rate_per_teu",
            defaults.ocean_rate_per_teu(),
            RateTables::ocean_rate_per_teu,
        );
        let (rail, rail_origin) = self.from_table(
            "rail_rate_per_km",
            defaults.rail_rate_per_km(),
            RateTables::rail_rate_per_km,
        );
        let (margin, margin_origin) = self.from_table(
            "margin_rate",
            defaults.margin_rate(),
            RateTables::margin_rate,
        );

        let live = self.live_rate().await;
        let fx_as_of = live.as_ref().map(|quote| quote.as_of);
        let (exchange, exchange_origin) = match live {
            Some(quote) => (quote.rate, RateOrigin::LiveFeed),
            None => self.from_table(
                "exchange_rate",
                defaults.exchange_rate(),
                RateTables::exchange_rate,
            ),
        };

        let rates = match RateSet::new(ocean, rail, margin, exchange) {
            Ok(rates) => rates,
            Err(err) => {
                tracing::warn!(error = %err, "resolved rates rejected; using defaults");
                return ResolvedRates::defaults(defaults.clone());
            }
        };

        let resolved = ResolvedRates {
            rates,
            origins: RateOrigins {
                ocean_rate_per_teu: ocean_origin,
                rail_rate_per_km: rail_origin,
                margin_rate: margin_origin,
                exchange_rate: exchange_origin,
            },
            fx_as_of,
        };
        tracing::info!(
            ocean = %resolved.rates.ocean_rate_per_teu(),
            rail = %resolved.rates.rail_rate_per_km(),
            margin = %resolved.rates.margin_rate(),
            exchange = %resolved.rates.exchange_rate(),
            degraded = resolved.is_degraded(),
            "resolved rates"
        );
        resolved
    }

    fn from_table(
        &self,
        field: &'static str,
        fallback: Decimal,
        lookup: impl FnOnce(&RateTables) -> Result<Decimal, RateTableError>,
    ) -> (Decimal, RateOrigin) {
        let Some(tables) = &self.tables else {
            tracing::warn!(field, "no rate tables configured; using default");
            return (fallback, RateOrigin::Default);
        };
        match lookup(tables) {
            Ok(value) if value > Decimal::ZERO => (value, RateOrigin::RateTable),
            Ok(value) => {
                tracing::warn!(field, %value, "rate table value is not positive; using default");
                (fallback, RateOrigin::Default)
            }
            Err(err) => {
                tracing::warn!(field, error = %err, "rate table lookup failed; using default");
                (fallback, RateOrigin::Default)
            }
        }
    }

    async fn live_rate(&self) -> Option<FxQuote> {
        let fx = self.fx.as_ref()?;
        match fx.latest().await {
            Ok(quote) if quote.rate > Decimal::ZERO => Some(quote),
            Ok(quote) => {
                tracing::warn!(rate = %quote.rate, "live exchange rate is not positive; falling back");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "live exchange rate unavailable; falling back");
                None
            }
        }
    }
}
