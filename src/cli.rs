//! CLI definition and dispatch.

use chrono::Duration;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_journal_adapter::CsvJournalAdapter;
use crate::adapters::csv_oracle_adapter::CsvOracleAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_settlement::PaperSettlement;
use crate::domain::asset::{AssetId, AssetRegistry};
use crate::domain::config_validation::{
    asset_section, read_decimal, read_period_days, validate_fund_config, FUND_SECTION,
};
use crate::domain::error::FundError;
use crate::domain::fixed_point::{format_decimal, SHARE_DECIMALS, WAD_DECIMALS};
use crate::domain::fund::{FundConfig, IndexFund};
use crate::domain::journal::{replay, ReplaySummary};
use crate::domain::scheduler::{SchedulerState, Timestamp};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "indexfund", about = "Market-cap weighted index fund ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a fund configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay a journal of oracle pushes and fund operations
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        journal: PathBuf,
        /// CSV price feed applied on top of the configured values
        #[arg(short, long)]
        prices: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Replay {
            config,
            journal,
            prices,
        } => run_replay(&config, &journal, prices.as_ref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = FundError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating fund config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_fund_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let fund_config = match build_fund_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let registry = match build_registry(&adapter, &fund_config.base_asset) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nFund:");
    eprintln!("  base asset:       {}", fund_config.base_asset);
    eprintln!(
        "  rebalance period: {} days",
        fund_config.rebalance_period.num_days()
    );

    eprintln!("\nAssets:");
    for asset in registry.iter() {
        eprintln!(
            "  {:<8} price {:>12}  market cap {}",
            asset.id.as_str(),
            format_decimal(asset.price, WAD_DECIMALS),
            format_decimal(asset.market_cap, WAD_DECIMALS),
        );
    }

    eprintln!("\nFund configuration is valid.");
    ExitCode::SUCCESS
}

fn run_replay(
    config_path: &PathBuf,
    journal_path: &PathBuf,
    prices_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_fund_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    match replay_files(&adapter, journal_path, prices_path) {
        Ok((fund, registry, summary, last_at)) => {
            eprintln!(
                "\nReplayed {} operations ({} rebalances, {} skipped, {} not due)",
                summary.applied, summary.rebalances, summary.skipped, summary.not_due
            );
            print_fund(&fund, &registry, last_at);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Build the fund and registry from `adapter`, apply the optional price feed
/// and replay the journal against a paper executor.
pub fn replay_files(
    adapter: &dyn ConfigPort,
    journal_path: &PathBuf,
    prices_path: Option<&PathBuf>,
) -> Result<(IndexFund, AssetRegistry, ReplaySummary, Option<Timestamp>), FundError> {
    // Stage 2: Build fund and oracle state
    let fund_config = build_fund_config(adapter)?;
    let mut registry = build_registry(adapter, &fund_config.base_asset)?;

    if let Some(path) = prices_path {
        eprintln!("Loading price feed from {}", path.display());
        let rows = CsvOracleAdapter::new(path.clone()).load_into(&mut registry)?;
        eprintln!("  {} feed rows applied", rows);
    }

    // Stage 3: Replay journal
    eprintln!("Loading journal from {}", journal_path.display());
    let entries = CsvJournalAdapter::new(journal_path.clone()).load()?;
    let last_at = entries.last().map(|e| e.at);

    let mut fund = IndexFund::new(fund_config);
    let mut settlement = PaperSettlement::new();
    let summary = replay(&mut fund, &mut registry, &mut settlement, &entries)?;

    Ok((fund, registry, summary, last_at))
}

pub fn build_fund_config(adapter: &dyn ConfigPort) -> Result<FundConfig, FundError> {
    let base_asset = adapter
        .get_string(FUND_SECTION, "base_asset")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FundError::ConfigMissing {
            section: FUND_SECTION.into(),
            key: "base_asset".into(),
        })?;

    let days = read_period_days(adapter)?;

    Ok(FundConfig {
        base_asset: AssetId::new(base_asset),
        rebalance_period: Duration::days(days),
    })
}

/// Registry seeded with the base asset's cap and every `[asset.*]` section
/// listed under `[fund] assets`.
pub fn build_registry(
    adapter: &dyn ConfigPort,
    base: &AssetId,
) -> Result<AssetRegistry, FundError> {
    let mut registry = AssetRegistry::new(base.clone());
    if let Some(cap) = read_decimal(adapter, FUND_SECTION, "base_market_cap")? {
        registry.set_market_cap(base, cap);
    }

    for name in adapter.get_list(FUND_SECTION, "assets") {
        let id = AssetId::new(name.as_str());
        registry.register(id.clone())?;
        let section = asset_section(&name);
        if let Some(price) = read_decimal(adapter, &section, "price")? {
            registry.set_price(&id, price)?;
        }
        if let Some(cap) = read_decimal(adapter, &section, "market_cap")? {
            registry.set_market_cap(&id, cap);
        }
    }

    Ok(registry)
}

fn print_fund(fund: &IndexFund, registry: &AssetRegistry, at: Option<Timestamp>) {
    eprintln!("\nHoldings:");
    let (assets, quantities) = fund.get_holdings();
    if assets.is_empty() {
        eprintln!("  (none)");
    }
    for (asset, quantity) in assets.iter().zip(quantities) {
        eprintln!(
            "  {:<8} {}",
            asset.as_str(),
            format_decimal(quantity, WAD_DECIMALS)
        );
    }

    eprintln!("\nShareholders:");
    let (holders, balances) = fund.get_shareholders();
    if holders.is_empty() {
        eprintln!("  (none)");
    }
    for (holder, balance) in holders.iter().zip(balances) {
        let value = fund
            .redeemable_value(holder, registry)
            .map(|v| format_decimal(v, WAD_DECIMALS))
            .unwrap_or_else(|e| format!("unavailable ({e})"));
        eprintln!(
            "  {:<12} {:>14} shares  worth {}",
            holder.as_str(),
            format_decimal(balance, SHARE_DECIMALS),
            value
        );
    }

    eprintln!("\nFund:");
    eprintln!(
        "  total shares:  {}",
        format_decimal(fund.total_shares(), SHARE_DECIMALS)
    );
    match fund.total_value(registry) {
        Ok(v) => eprintln!("  total value:   {}", format_decimal(v, WAD_DECIMALS)),
        Err(e) => eprintln!("  total value:   unavailable ({e})"),
    }
    match fund.nav_per_share(registry) {
        Ok(v) => eprintln!("  NAV per share: {}", format_decimal(v, WAD_DECIMALS)),
        Err(e) => eprintln!("  NAV per share: unavailable ({e})"),
    }

    match fund.target_weights(registry) {
        Ok(Some(weights)) => {
            eprintln!("\nTarget weights:");
            for (asset, weight) in weights {
                eprintln!(
                    "  {:<8} {}",
                    asset.as_str(),
                    format_decimal(weight, WAD_DECIMALS)
                );
            }
        }
        Ok(None) => eprintln!("\nTarget weights: no market caps reported"),
        Err(e) => eprintln!("\nTarget weights: unavailable ({e})"),
    }

    eprintln!("\nScheduler:");
    match fund.scheduler().last_rebalance() {
        Some(last) => eprintln!("  last rebalance: {}", last),
        None => eprintln!("  last rebalance: never"),
    }
    if let Some(now) = at {
        match fund.scheduler_state(now) {
            SchedulerState::Idle => eprintln!("  state at {}: idle", now),
            SchedulerState::Cooling { until } => {
                eprintln!("  state at {}: cooling until {}", now, until)
            }
        }
    }
}
