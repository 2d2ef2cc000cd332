use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use num_bigint::BigUint;
use stakenet_core::*;
use std::process;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "stakenet-cli")]
#[command(about = "Stakenet Core CLI - Ledger execution engine utilities")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute how much of a coin must be sold to extract a base-coin amount
    SaleAmount {
        /// Coin volume (circulating supply), decimal
        #[arg(long)]
        volume: String,

        /// Coin reserve in base coin, decimal
        #[arg(long)]
        reserve: String,

        /// Constant reserve ratio, integer percent
        #[arg(long)]
        crr: u32,

        /// Base-coin amount to extract, decimal
        #[arg(long)]
        amount: String,
    },

    /// Compute the base-coin return for selling a coin amount
    SaleReturn {
        /// Coin volume (circulating supply), decimal
        #[arg(long)]
        volume: String,

        /// Coin reserve in base coin, decimal
        #[arg(long)]
        reserve: String,

        /// Constant reserve ratio, integer percent
        #[arg(long)]
        crr: u32,

        /// Coin amount to sell, decimal
        #[arg(long)]
        amount: String,
    },

    /// Decode a raw transaction (hex) and print it with its base commission
    DecodeTx {
        /// Raw transaction bytes in hex
        #[arg(long)]
        tx: String,
    },

    /// Estimate the gas-coin commission of a raw transaction (hex)
    EstimateCommission {
        /// Raw transaction bytes in hex
        #[arg(long)]
        tx: String,

        /// Gas coin volume, decimal (required for a non-base gas coin)
        #[arg(long)]
        gas_coin_volume: Option<String>,

        /// Gas coin reserve, decimal (required for a non-base gas coin)
        #[arg(long)]
        gas_coin_reserve: Option<String>,

        /// Gas coin constant reserve ratio (required for a non-base gas coin)
        #[arg(long)]
        gas_coin_crr: Option<u32>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::SaleAmount {
            volume,
            reserve,
            crr,
            amount,
        } => handle_sale_amount(volume, reserve, crr, amount),
        Commands::SaleReturn {
            volume,
            reserve,
            crr,
            amount,
        } => handle_sale_return(volume, reserve, crr, amount),
        Commands::DecodeTx { tx } => handle_decode_tx(tx),
        Commands::EstimateCommission {
            tx,
            gas_coin_volume,
            gas_coin_reserve,
            gas_coin_crr,
        } => handle_estimate_commission(tx, gas_coin_volume, gas_coin_reserve, gas_coin_crr),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn parse_amount(name: &str, value: &str) -> Result<BigUint> {
    BigUint::from_str(value).with_context(|| format!("Invalid decimal value for {}", name))
}

fn handle_sale_amount(volume: String, reserve: String, crr: u32, amount: String) -> Result<()> {
    let volume = parse_amount("volume", &volume)?;
    let reserve = parse_amount("reserve", &reserve)?;
    let amount = parse_amount("amount", &amount)?;

    let result = calculate_sale_amount(&volume, &reserve, crr, &amount)?;
    println!("{}", result);
    Ok(())
}

fn handle_sale_return(volume: String, reserve: String, crr: u32, amount: String) -> Result<()> {
    let volume = parse_amount("volume", &volume)?;
    let reserve = parse_amount("reserve", &reserve)?;
    let amount = parse_amount("amount", &amount)?;

    let result = calculate_sale_return(&volume, &reserve, crr, &amount)?;
    println!("{}", result);
    Ok(())
}

fn handle_decode_tx(tx_hex: String) -> Result<()> {
    let raw = hex::decode(tx_hex.trim()).context("Invalid transaction hex")?;
    let tx = TxDecoder::decode_from_bytes_without_sig(&raw)?;

    println!("{}", serde_json::to_string_pretty(&tx)?);
    println!("Type byte: {:#04x}", tx.tx_type().type_byte());
    println!("Gas units: {}", tx.gas());
    println!("Commission in base coin: {}", tx.commission_in_base_coin());
    Ok(())
}

fn handle_estimate_commission(
    tx_hex: String,
    gas_coin_volume: Option<String>,
    gas_coin_reserve: Option<String>,
    gas_coin_crr: Option<u32>,
) -> Result<()> {
    let raw = hex::decode(tx_hex.trim()).context("Invalid transaction hex")?;
    let tx = TxDecoder::decode_from_bytes_without_sig(&raw)?;

    let state = LedgerState::new();
    if !tx.gas_coin.is_base_coin() {
        let (volume, reserve, crr) = match (gas_coin_volume, gas_coin_reserve, gas_coin_crr) {
            (Some(v), Some(r), Some(c)) => (v, r, c),
            _ => bail!(
                "Gas coin {} is not the base coin; provide --gas-coin-volume, --gas-coin-reserve and --gas-coin-crr",
                tx.gas_coin
            ),
        };
        state
            .coins
            .create(
                Coin {
                    id: tx.gas_coin,
                    symbol: "GASCOIN".to_string(),
                    volume: parse_amount("gas-coin-volume", &volume)?,
                    reserve: parse_amount("gas-coin-reserve", &reserve)?,
                    crr,
                    max_supply: max_coin_supply(),
                },
                None,
            )
            .map_err(StakenetError::from)?;
    }

    let history = StateHistory::new();
    history.save(0, state.snapshot());

    match estimate_tx_commission(&history, &raw, Some(0)) {
        Ok(resp) => {
            println!("{}", serde_json::to_string(&resp)?);
            Ok(())
        }
        Err(e) => bail!("{}", e),
    }
}
