//! Adapters to the outside world: tariff sheets on disk and the live FX feed.

pub mod fx;
pub mod rate_provider;
pub mod rate_tables;

pub use fx::{FxClient, FxClientError, FxQuote, FxSettings};
pub use rate_provider::{RateProvider, RateSettings};
pub use rate_tables::{default_data_dir, RateTableError, RateTableLayout, RateTables};
