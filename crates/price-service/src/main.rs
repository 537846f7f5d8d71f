use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use price_config::{NetworkConfig, NetworkRegistry};
use price_engine::PriceEngine;
use price_types::{Address, BlockNumber, Decimal, Quote};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "price-resolver")]
#[command(about = "Resolve USD prices of ERC-20 tokens from on-chain sources", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Additional network configuration file (TOML, JSON or YAML)
	#[arg(short, long, value_name = "FILE", env = "PRICE_RESOLVER_CONFIG")]
	config: Option<PathBuf>,

	/// Network to resolve prices on
	#[arg(short, long, env = "PRICE_RESOLVER_NETWORK", default_value = "mainnet")]
	network: String,

	/// JSON-RPC endpoint of the network
	#[arg(long, env = "PRICE_RESOLVER_RPC_URL")]
	rpc_url: Option<String>,

	#[arg(long, env = "PRICE_RESOLVER_LOG_LEVEL", default_value = "info")]
	log_level: String,

	/// Print results as JSON
	#[arg(long)]
	json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Resolve the USD price of one token
	Price {
		token: Address,
		/// Historical block number; latest when omitted
		#[arg(long)]
		block: Option<BlockNumber>,
	},
	/// Resolve the USD value of an amount of whole tokens
	Value {
		token: Address,
		amount: Decimal,
		#[arg(long)]
		block: Option<BlockNumber>,
	},
	/// Validate the built-in and supplied network configurations
	Validate,
	/// List known networks
	Networks,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	match &cli.command {
		Commands::Price { token, block } => price(&cli, *token, *block).await,
		Commands::Value {
			token,
			amount,
			block,
		} => value(&cli, *token, *amount, *block).await,
		Commands::Validate => validate(&cli).await,
		Commands::Networks => networks(&cli).await,
	}
}

/// Built-in networks plus the one from `--config`, if given.
async fn load_registry(cli: &Cli) -> Result<NetworkRegistry> {
	let mut registry = NetworkRegistry::builtin().context("Failed to load built-in networks")?;

	if let Some(path) = &cli.config {
		info!("Loading configuration from: {:?}", path);
		let name = registry
			.load_file(path)
			.await
			.with_context(|| format!("Failed to load configuration {:?}", path))?;
		info!("Registered network '{}'", name);
	}

	Ok(registry)
}

async fn build_engine(cli: &Cli) -> Result<PriceEngine> {
	let registry = load_registry(cli).await?;
	let config = registry.get_required(&cli.network)?;
	let rpc_url = cli
		.rpc_url
		.as_deref()
		.context("An RPC endpoint is required (--rpc-url or PRICE_RESOLVER_RPC_URL)")?;

	PriceEngine::from_rpc(config, rpc_url).context("Failed to build price engine")
}

async fn price(cli: &Cli, token: Address, block: Option<BlockNumber>) -> Result<()> {
	let engine = build_engine(cli).await?;
	let quote = engine.resolve_usd_price(token, block).await;

	if cli.json {
		println!("{}", serde_json::to_string_pretty(&quote)?);
	} else {
		println!("{}", describe_quote(&token, &quote));
	}
	Ok(())
}

async fn value(cli: &Cli, token: Address, amount: Decimal, block: Option<BlockNumber>) -> Result<()> {
	let engine = build_engine(cli).await?;
	let usd = engine.resolve_usd_value(token, amount, block).await;

	if cli.json {
		let output = serde_json::json!({
			"token": token,
			"amount": amount,
			"usd_value": usd,
		});
		println!("{}", serde_json::to_string_pretty(&output)?);
	} else {
		println!("{} {} = {} USD", amount, token, usd);
	}
	Ok(())
}

async fn validate(cli: &Cli) -> Result<()> {
	let registry = load_registry(cli).await?;

	for name in registry.networks() {
		let config = registry.get_required(&name)?;
		info!("Network '{}' is valid", name);
		print_network(&config);
	}
	Ok(())
}

async fn networks(cli: &Cli) -> Result<()> {
	let registry = load_registry(cli).await?;
	for name in registry.networks() {
		println!("{}", name);
	}
	Ok(())
}

fn print_network(config: &Arc<NetworkConfig>) {
	info!("  Chain id: {}", config.chain_id);
	info!(
		"  Default order: {}",
		config
			.oracle_order
			.iter()
			.map(|kind| kind.as_str())
			.collect::<Vec<_>>()
			.join(", ")
	);
	info!("  Quotes per token: {}", config.oracle_count);
	info!("  Hardcoded stables: {}", config.hardcoded_stables.len());
	for oracle in &config.oracles {
		info!("  Source: {} ({} blacklisted)", oracle.kind(), oracle.blacklist().len());
	}
	info!("  Overrides: {}", config.overrides.len());
}

fn describe_quote(token: &Address, quote: &Quote) -> String {
	if quote.is_reverted() {
		return format!("{}: no price available", token);
	}

	let mut line = format!(
		"{}: {} USD via {}",
		token,
		quote.normalized_price().normalize(),
		quote.source
	);
	if !quote.liquidity_usd.is_zero() {
		line.push_str(&format!(" (liquidity {} USD)", quote.liquidity_usd.round_dp(2)));
	}
	line
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}
