//! Tariff sheets exported as CSV by the carrier, the rail operator and the forwarder.
//!
//! - Ocean rates: one row per trade lane, one column per quarter.
//! - Inland and handling data: `Item,Value` key/value sheets.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATA_DIR_NAME: &str = "nextrade";
const ITEM_COLUMN: &str = "Item";
const VALUE_COLUMN: &str = "Value";

/// Default location of the tariff sheets (`<local data dir>/nextrade/logistics`).
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join("logistics")
}

/// File names and keys used to pick the rates out of the sheets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTableLayout {
    pub ocean_file: String,
    pub ocean_key_column: String,
    pub ocean_route: String,
    pub ocean_price_column: String,
    pub inland_file: String,
    pub rail_item: String,
    pub handling_file: String,
    /// Forwarder margin, stored in percent.
    pub margin_item: String,
    pub exchange_item: String,
}

impl Default for RateTableLayout {
    fn default() -> Self {
        Self {
            ocean_file: "hmm_shipping_data.csv".into(),
            ocean_key_column: "Route".into(),
            ocean_route: "Asia-Europe".into(),
            ocean_price_column: "Price_2025_3Q".into(),
            inland_file: "lx_inland.csv".into(),
            rail_item: "Rail_Unit_Price_TCR".into(),
            handling_file: "glocis_handle_data.csv".into(),
            margin_item: "Logistics_Margin".into(),
            exchange_item: "Exchange_Rate".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RateTableError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{table} is unavailable: {reason}")]
    Unavailable { table: String, reason: String },
    #[error("{table} has no column {column}")]
    MissingColumn { table: String, column: String },
    #[error("{table} has no row where {column} = {key}")]
    MissingRow {
        table: String,
        column: String,
        key: String,
    },
    #[error("{table}: {value:?} is not a number")]
    InvalidValue { table: String, value: String },
}

#[derive(Clone, Debug)]
struct Table {
    name: String,
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn load(path: &Path) -> Result<Self, RateTableError> {
        let csv_error = |source| RateTableError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            headers,
            rows,
        })
    }

    fn column(&self, column: &str) -> Result<usize, RateTableError> {
        self.headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| RateTableError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Value of `value_column` on the first row whose `key_column` equals `key`.
    fn lookup(
        &self,
        key_column: &str,
        key: &str,
        value_column: &str,
    ) -> Result<Decimal, RateTableError> {
        let key_idx = self.column(key_column)?;
        let value_idx = self.column(value_column)?;

        let raw = self
            .rows
            .iter()
            .find(|row| row.get(key_idx) == Some(key))
            .and_then(|row| row.get(value_idx))
            .ok_or_else(|| RateTableError::MissingRow {
                table: self.name.clone(),
                column: key_column.to_string(),
                key: key.to_string(),
            })?;

        parse_number(raw).ok_or_else(|| RateTableError::InvalidValue {
            table: self.name.clone(),
            value: raw.to_string(),
        })
    }
}

/// The three tariff sheets, loaded once. A sheet that fails to load only
/// affects the rates read from it.
#[derive(Debug)]
pub struct RateTables {
    layout: RateTableLayout,
    ocean: Result<Table, String>,
    inland: Result<Table, String>,
    handling: Result<Table, String>,
}

impl RateTables {
    pub fn load(dir: &Path, layout: RateTableLayout) -> Self {
        let ocean = load_logged(dir, &layout.ocean_file);
        let inland = load_logged(dir, &layout.inland_file);
        let handling = load_logged(dir, &layout.handling_file);
        Self {
            layout,
            ocean,
            inland,
            handling,
        }
    }

    pub fn layout(&self) -> &RateTableLayout {
        &self.layout
    }

    /// Ocean freight per TEU for the configured lane and quarter.
    pub fn ocean_rate_per_teu(&self) -> Result<Decimal, RateTableError> {
        table(&self.ocean, &self.layout.ocean_file)?.lookup(
            &self.layout.ocean_key_column,
            &self.layout.ocean_route,
            &self.layout.ocean_price_column,
        )
    }

    pub fn rail_rate_per_km(&self) -> Result<Decimal, RateTableError> {
        table(&self.inland, &self.layout.inland_file)?.lookup(
            ITEM_COLUMN,
            &self.layout.rail_item,
            VALUE_COLUMN,
        )
    }

    /// Forwarder margin as a fraction; the sheet stores it in percent.
    pub fn margin_rate(&self) -> Result<Decimal, RateTableError> {
        let percent = table(&self.handling, &self.layout.handling_file)?.lookup(
            ITEM_COLUMN,
            &self.layout.margin_item,
            VALUE_COLUMN,
        )?;
        Ok(percent / Decimal::ONE_HUNDRED)
    }

    pub fn exchange_rate(&self) -> Result<Decimal, RateTableError> {
        table(&self.handling, &self.layout.handling_file)?.lookup(
            ITEM_COLUMN,
            &self.layout.exchange_item,
            VALUE_COLUMN,
        )
    }
}

fn load_logged(dir: &Path, file: &str) -> Result<Table, String> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "rate table not found");
        return Err(format!("{} does not exist", path.display()));
    }
    match Table::load(&path) {
        Ok(table) => {
            tracing::debug!(path = %path.display(), rows = table.rows.len(), "loaded rate table");
            Ok(table)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to load rate table");
            Err(err.to_string())
        }
    }
}

fn table<'a>(loaded: &'a Result<Table, String>, file: &str) -> Result<&'a Table, RateTableError> {
    loaded
        .as_ref()
        .map_err(|reason| RateTableError::Unavailable {
            table: file.to_string(),
            reason: reason.clone(),
        })
}

/// Accepts thousands separators ("1,481") as exported by spreadsheet tools.
fn parse_number(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}
