//! CSV journal adapter.
//!
//! Each row is `timestamp,action,target,amount`. Deposits, prices and caps are
//! whole base units; withdrawals are whole shares.

use crate::domain::asset::AssetId;
use crate::domain::error::FundError;
use crate::domain::fixed_point::{parse_decimal, SHARE_DECIMALS, WAD_DECIMALS};
use crate::domain::journal::{JournalEntry, Operation};
use crate::domain::scheduler::Timestamp;
use crate::domain::shares::Address;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::PathBuf;

pub struct CsvJournalAdapter {
    path: PathBuf,
}

impl CsvJournalAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Vec<JournalEntry>, FundError> {
        let content = fs::read_to_string(&self.path)?;
        parse_journal(&content)
    }
}

/// Timestamps must not go backwards.
pub fn parse_journal(content: &str) -> Result<Vec<JournalEntry>, FundError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut entries: Vec<JournalEntry> = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let fallback_line = idx + 2;
        let record = result.map_err(|e| FundError::Journal {
            line: fallback_line,
            reason: format!("CSV parse error: {}", e),
        })?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        let at = parse_timestamp(column(&record, 0), line)?;
        if let Some(prev) = entries.last() {
            if at < prev.at {
                return Err(FundError::Journal {
                    line,
                    reason: format!("timestamp {} is before {}", at, prev.at),
                });
            }
        }

        let operation = parse_operation(&record, line)?;
        entries.push(JournalEntry {
            line,
            at,
            operation,
        });
    }

    Ok(entries)
}

pub fn parse_timestamp(raw: &str, line: usize) -> Result<Timestamp, FundError> {
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(at);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|e| FundError::Journal {
            line,
            reason: format!("invalid timestamp {:?}: {}", raw, e),
        })
}

fn parse_operation(record: &StringRecord, line: usize) -> Result<Operation, FundError> {
    let action = column(record, 1);
    let operation = match action {
        "set_price" => Operation::SetPrice {
            asset: AssetId::from(target(record, line)?),
            price: amount(record, WAD_DECIMALS, line)?,
        },
        "set_market_cap" => Operation::SetMarketCap {
            asset: AssetId::from(target(record, line)?),
            market_cap: amount(record, WAD_DECIMALS, line)?,
        },
        "deposit" => Operation::Deposit {
            investor: Address::from(target(record, line)?),
            amount: amount(record, WAD_DECIMALS, line)?,
        },
        "withdraw" | "withdraw_dry" => Operation::Withdraw {
            investor: Address::from(target(record, line)?),
            shares: amount(record, SHARE_DECIMALS, line)?,
            settle_externally: action == "withdraw",
        },
        "rebalance" => Operation::Rebalance,
        other => {
            return Err(FundError::Journal {
                line,
                reason: format!("unknown action {:?}", other),
            });
        }
    };
    Ok(operation)
}

fn column(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn target(record: &StringRecord, line: usize) -> Result<&str, FundError> {
    match column(record, 2) {
        "" => Err(FundError::Journal {
            line,
            reason: "missing target column".into(),
        }),
        t => Ok(t),
    }
}

fn amount(record: &StringRecord, decimals: u32, line: usize) -> Result<u128, FundError> {
    parse_decimal(column(record, 3), decimals).map_err(|reason| FundError::Journal {
        line,
        reason: format!("invalid amount: {}", reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixed_point::{SHARE_UNIT, WAD};
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,action,target,amount\n";

    fn journal(rows: &str) -> Result<Vec<JournalEntry>, FundError> {
        parse_journal(&format!("{HEADER}{rows}"))
    }

    #[test]
    fn parses_every_action() {
        let entries = journal(
            "2024-01-01,set_price,WBTC,2\n\
             2024-01-01,set_market_cap,ETH,1e12\n\
             2024-01-01,deposit,alice,1.5\n\
             2024-01-02T12:30:00,withdraw,alice,0.5\n\
             2024-01-03,withdraw_dry,alice,0.25\n\
             2024-01-08,rebalance,,\n",
        )
        .unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[0].operation,
            Operation::SetPrice { asset: "WBTC".into(), price: 2 * WAD }
        );
        assert_eq!(
            entries[1].operation,
            Operation::SetMarketCap {
                asset: "ETH".into(),
                market_cap: 1_000_000_000_000 * WAD
            }
        );
        assert_eq!(
            entries[2].operation,
            Operation::Deposit { investor: "alice".into(), amount: 3 * WAD / 2 }
        );
        assert_eq!(
            entries[3].operation,
            Operation::Withdraw {
                investor: "alice".into(),
                shares: SHARE_UNIT / 2,
                settle_externally: true
            }
        );
        assert_eq!(
            entries[4].operation,
            Operation::Withdraw {
                investor: "alice".into(),
                shares: SHARE_UNIT / 4,
                settle_externally: false
            }
        );
        assert_eq!(entries[5].operation, Operation::Rebalance);
        assert_eq!(entries[5].line, 7);
        assert_eq!(
            entries[3].at,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn rebalance_row_may_omit_trailing_columns() {
        let entries = journal("2024-01-08,rebalance\n").unwrap();
        assert_eq!(entries[0].operation, Operation::Rebalance);
    }

    #[test]
    fn unknown_action_rejected() {
        let err = journal("2024-01-01,mint,alice,1\n").unwrap_err();
        assert!(matches!(err, FundError::Journal { line: 2, reason } if reason.contains("mint")));
    }

    #[test]
    fn missing_target_rejected() {
        let err = journal("2024-01-01,deposit,,1\n").unwrap_err();
        assert!(matches!(err, FundError::Journal { reason, .. } if reason.contains("target")));
    }

    #[test]
    fn share_amount_precision_is_limited() {
        let err = journal("2024-01-01,withdraw,alice,0.0000001\n").unwrap_err();
        assert!(matches!(err, FundError::Journal { reason, .. } if reason.contains("amount")));
    }

    #[test]
    fn bad_timestamp_rejected() {
        let err = journal("01/02/2024,rebalance,,\n").unwrap_err();
        assert!(matches!(err, FundError::Journal { reason, .. } if reason.contains("timestamp")));
    }

    #[test]
    fn timestamps_must_not_go_backwards() {
        let err = journal("2024-01-05,rebalance,,\n2024-01-04,rebalance,,\n").unwrap_err();
        assert!(matches!(err, FundError::Journal { line: 3, .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ops.csv");
        fs::write(&path, format!("{HEADER}2024-01-01,deposit,bob,2\n")).unwrap();

        let entries = CsvJournalAdapter::new(path).load().unwrap();
        assert_eq!(
            entries[0].operation,
            Operation::Deposit { investor: "bob".into(), amount: 2 * WAD }
        );
    }
}
