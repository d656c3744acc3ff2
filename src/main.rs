//! ipmatch - evaluate CIDR_MATCH over a list of IP addresses

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use ipmatch::driver::{self, DriverConfig};
use std::io::Read;
use std::path::PathBuf;

/// ipmatch - Check which addresses fall in any of the given CIDR ranges
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CIDR ranges to match against, e.g. 10.0.0.0/8
    #[arg(required = true)]
    cidrs: Vec<String>,

    /// File with one address per line (reads stdin when absent).
    /// Empty lines are null rows, comma separated addresses are multi-valued rows.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum rows per page
    #[arg(short, long, default_value = "1024")]
    batch_size: usize,

    /// Worker threads, each with its own evaluator
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let rows = match &args.input {
        Some(path) => driver::load_addresses(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read addresses from stdin")?;
            driver::parse_addresses(&text).context("Invalid address on stdin")?
        }
    };

    let config = DriverConfig {
        batch_size: args.batch_size,
        workers: args.workers,
    };
    let results = driver::run(&config, &rows, &args.cidrs)?;

    for (row, result) in rows.iter().zip(results) {
        let result = match result {
            Some(true) => "true",
            Some(false) => "false",
            None => "null",
        };
        println!("{}\t{}", driver::format_row(row), result);
    }

    Ok(())
}
