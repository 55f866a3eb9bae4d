//! CSV price feed adapter.
//!
//! Rows are `asset,price,market_cap` in whole units. An empty column leaves
//! the current value untouched. The whole file is parsed before any value is
//! pushed, so a bad row leaves the registry as it was.

use crate::domain::asset::{AssetId, AssetRegistry};
use crate::domain::error::FundError;
use crate::domain::fixed_point::{parse_decimal, WAD, WAD_DECIMALS};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    pub line: usize,
    pub asset: AssetId,
    pub price: Option<u128>,
    pub market_cap: Option<u128>,
}

pub struct CsvOracleAdapter {
    path: PathBuf,
}

impl CsvOracleAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Push every row of the feed file into `registry`. Returns the row count.
    pub fn load_into(&self, registry: &mut AssetRegistry) -> Result<usize, FundError> {
        let content = fs::read_to_string(&self.path)?;
        apply_feed(&content, registry)
    }
}

pub fn parse_feed(content: &str) -> Result<Vec<FeedRow>, FundError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let fallback_line = idx + 2;
        let record = result.map_err(|e| FundError::Feed {
            line: fallback_line,
            reason: format!("CSV parse error: {}", e),
        })?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        let asset = match record.get(0) {
            Some(id) if !id.is_empty() => AssetId::from(id),
            _ => {
                return Err(FundError::Feed {
                    line,
                    reason: "missing asset column".into(),
                });
            }
        };

        rows.push(FeedRow {
            line,
            asset,
            price: decimal_column(&record, 1, "price", line)?,
            market_cap: decimal_column(&record, 2, "market_cap", line)?,
        });
    }

    Ok(rows)
}

/// Parse `content` and push it into `registry` only if every row is valid.
/// The base asset's price column may be empty or exactly 1.
pub fn apply_feed(content: &str, registry: &mut AssetRegistry) -> Result<usize, FundError> {
    let rows = parse_feed(content)?;
    let mut staged = registry.clone();

    for row in &rows {
        if let Some(price) = row.price {
            if &row.asset == staged.base() {
                if price != WAD {
                    return Err(FundError::Feed {
                        line: row.line,
                        reason: format!("price of base asset {} is fixed at 1", row.asset),
                    });
                }
            } else {
                staged.set_price(&row.asset, price)?;
            }
        }
        if let Some(cap) = row.market_cap {
            staged.set_market_cap(&row.asset, cap);
        }
    }

    *registry = staged;
    Ok(rows.len())
}

fn decimal_column(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<Option<u128>, FundError> {
    match record.get(index) {
        None | Some("") => Ok(None),
        Some(raw) => parse_decimal(raw, WAD_DECIMALS)
            .map(Some)
            .map_err(|reason| FundError::Feed {
                line,
                reason: format!("invalid {} value: {}", name, reason),
            }),
    }
}
