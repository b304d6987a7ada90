//! Landed-cost quotes for container shipments on the Korea → China → Central
//! Asia corridor, split between seller and buyer by trade term.

pub mod domain;
pub mod infra;
pub mod util;

pub use domain::{
    CostBundle, CostContext, CostEngine, CostLineItem, Incoterm, IncotermAllocator, Quote,
    QuoteRequest, Quoter, RateSet, ResolvedRates, RouteSpec, ValidationError,
};
pub use infra::{RateProvider, RateSettings};
pub use util::settings::{load_settings, Settings, SettingsError};
