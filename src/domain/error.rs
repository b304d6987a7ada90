use rust_decimal::Decimal;
use thiserror::Error;

/// Rejections raised before any cost is computed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("TEU count must be at least 1")]
    NonPositiveTeu,
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
    #[error("unknown trade term: {0}")]
    UnknownIncoterm(String),
    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: Decimal },
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{field} is too large to compute")]
    Overflow { field: &'static str },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
