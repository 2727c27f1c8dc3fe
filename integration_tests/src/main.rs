//! Integration tests for the BLE peripheral firmware.
//!
//! Run after flashing the firmware. Acts as a BLE central against the
//! device and checks its advertising and connection lifecycle.

mod ble_client;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::BleClient;
use tests::{print_results, run_all_tests, TestSettings};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Connection lifecycle tests for the BLE peripheral firmware")]
struct Args {
    /// Advertised device name
    #[arg(long, default_value = "BLE Peripheral")]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Seconds to hold a link open; must cover the first parameter update
    #[arg(long, default_value = "10")]
    hold: u64,

    /// Connect/disconnect cycles
    #[arg(long, default_value = "3")]
    cycles: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "BLE Peripheral Integration Tests".bold());
    println!("Device: \"{}\"", args.name);
    println!();

    let mut client = BleClient::new(&args.name).await?;
    let settings = TestSettings {
        scan_timeout: Duration::from_secs(args.scan_timeout),
        hold: Duration::from_secs(args.hold),
        cycles: args.cycles,
    };

    println!("{}", "Running tests...".bold());
    println!();

    let results = run_all_tests(&mut client, &settings).await;
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
