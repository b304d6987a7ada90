//! Pure cost and trade-term logic. Nothing in here performs I/O.

pub mod cost_engine;
pub mod entities;
pub mod error;
pub mod incoterms;
pub mod quote;

pub use cost_engine::{CostEngine, CostEngineConfig, Surcharges};
pub use entities::{
    CostBundle, CostContext, CostLineItem, DestinationProfile, RateOrigin, RateOrigins, RateSet,
    ResolvedRates, RouteSpec, TransitLegs, TransitWindow,
};
pub use error::ValidationError;
pub use incoterms::{
    AllocatorConfig, Incoterm, IncotermAllocator, IncotermGroup, LineCategory, LineSlot,
};
pub use quote::{
    cost_context, seller_risk, ProductCost, Quote, QuoteRequest, QuoteSettings, Quoter,
    RiskLevel, SellerRisk,
};
