//! OANDA Bridge - Entry Point
//!
//! Prints normalized account and market snapshots as JSON.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the API token from env (OANDA_API_TOKEN)
//! 4. Create OandaClient (HTTP + auth + pacing + retry)
//! 5. Create the Exchange facade over the client
//! 6. Run one command and print its result
//!
//! Usage: `oanda-bridge <command> [args]`, config path from
//! `OANDA_BRIDGE_CONFIG` (default `config.toml`).

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use oanda_bridge::adapters::metrics::MetricsRegistry;
use oanda_bridge::adapters::oanda::{OandaClient, OandaClientConfig};
use oanda_bridge::config::{self, AppConfig};
use oanda_bridge::ports::transport::Params;
use oanda_bridge::usecases::exchange::Exchange;

const USAGE: &str = "usage: oanda-bridge <command> [args]

commands:
  markets                       instrument catalogue
  ticker <SYMBOL>...            current prices
  orderbook <SYMBOL>            order book snapshot
  candles <SYMBOL> <TF> [N]     OHLCV bars
  orders [open|closed|canceled] orders by state
  order <ID>                    single order
  positions                     open positions
  trades [SYMBOL]               account fills
  ledger [CURRENCY]             full transaction ledger
  transfers                     deposits and withdrawals
  balance                       account balance
  leverage                      account margin rate
  metrics                       request metrics after a ledger pull";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("{USAGE}");
    };

    // ── 1. Load configuration from config.toml ──────────────
    let path = std::env::var("OANDA_BRIDGE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.broker.environment,
        command = %command,
        "Starting OANDA bridge"
    );

    // ── 3. Load API token from env ──────────────────────────
    let token = config::loader::api_token().context("Failed to load OANDA credentials from env")?;

    // ── 4. Create OANDA HTTP client ─────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
    let client_config = OandaClientConfig {
        base_url: config.broker.url().to_string(),
        account_id: config.broker.account_id.clone(),
        token,
        timeout: config.broker.timeout(),
        max_concurrent: config.broker.max_concurrent,
        max_retries: config.broker.max_retries,
        requests_per_second: config.broker.requests_per_second,
        ..OandaClientConfig::default()
    };
    let client = Arc::new(
        OandaClient::new(client_config)
            .context("Failed to create OANDA client")?
            .with_metrics(Arc::clone(&metrics)),
    );

    // ── 5. Exchange facade ──────────────────────────────────
    let exchange = Exchange::new(client, config.pager.page_size).with_metrics(Arc::clone(&metrics));

    // ── 6. Run command ──────────────────────────────────────
    match command.as_str() {
        "markets" => print(&exchange.fetch_markets(&Params::new()).await?),
        "ticker" => print(&exchange.fetch_tickers(rest).await?),
        "orderbook" => print(&exchange.fetch_order_book(arg(rest, 0, "SYMBOL")?).await?),
        "candles" => {
            let limit = rest
                .get(2)
                .map(|n| n.parse::<u32>())
                .transpose()
                .context("N must be a positive integer")?;
            print(
                &exchange
                    .fetch_ohlcv(arg(rest, 0, "SYMBOL")?, arg(rest, 1, "TF")?, None, limit)
                    .await?,
            )
        }
        "orders" => {
            let orders = match rest.first().map(String::as_str) {
                None => exchange.fetch_orders(None, None, None, &Params::new()).await?,
                Some("open") => exchange.fetch_open_orders(None, None, None).await?,
                Some("closed") => exchange.fetch_closed_orders(None, None, None).await?,
                Some("canceled") => exchange.fetch_canceled_orders(None, None, None).await?,
                Some(other) => bail!("unknown order state {other}"),
            };
            print(&orders)
        }
        "order" => print(&exchange.fetch_order(arg(rest, 0, "ID")?).await?),
        "positions" => print(&exchange.fetch_positions(None).await?),
        "trades" => {
            print(&exchange.fetch_my_trades(rest.first().map(String::as_str), None, None).await?)
        }
        "ledger" => print(
            &exchange
                .fetch_ledger(rest.first().map(String::as_str), None, None, &Params::new())
                .await?,
        ),
        "transfers" => print(&exchange.fetch_transfers(None, None, None).await?),
        "balance" => print(&exchange.fetch_balance().await?),
        "leverage" => print(&exchange.fetch_leverage().await?),
        "metrics" => {
            exchange.fetch_ledger(None, None, None, &Params::new()).await?;
            println!("{}", metrics.render()?);
            Ok(())
        }
        _ => bail!("unknown command {command}\n\n{USAGE}"),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn arg<'a>(rest: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    rest.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing {name}\n\n{USAGE}"))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
