use anyhow::Result;
use clap::Parser;
use gold_repricer::config::AppConfig;
use gold_repricer::debug;
use gold_repricer::pricing::TaxBase;
use gold_repricer::workflow::{run_sync, SyncOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Gold Repricer - marketplace price sync from the gold spot price")]
struct Args {
    /// Path to the TOML config file
    #[clap(short, long, default_value = "gold-repricer.toml")]
    config: PathBuf,

    /// Reprice this local sheet (.xlsx or .csv) instead of requesting a marketplace export
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Path for the repriced sheet (default: timestamped file in the work dir)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Directory for downloaded exports and generated sheets
    #[clap(short, long, default_value = ".")]
    work_dir: PathBuf,

    /// Gold price per gram to use instead of the quote API
    #[clap(short, long)]
    gold_price: Option<f64>,

    /// Override the configured tax base (full | labor_and_profit_only)
    #[clap(long)]
    tax_base: Option<TaxBase>,

    /// Append every recalculated price to this CSV file
    #[clap(long)]
    change_log: Option<PathBuf>,

    /// Do not upload the repriced sheet to the marketplace
    #[clap(long)]
    no_upload: bool,

    /// Calculate and report prices without writing or uploading anything
    #[clap(short = 'n', long)]
    dry_run: bool,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    debug::init_from_env(args.debug);

    println!("Gold Repricer");
    println!("=============");

    let mut config = AppConfig::load(Some(&args.config))?;
    if let Some(tax_base) = args.tax_base {
        config.pricing.tax_base = tax_base;
    }

    let options = SyncOptions {
        input: args.input,
        output: args.output,
        work_dir: args.work_dir,
        gold_price_override: args.gold_price,
        change_log: args.change_log,
        upload: !args.no_upload,
        dry_run: args.dry_run,
    };

    let summary = run_sync(&config, &options)?;

    println!("\n=== Summary ===");
    println!("Gold price per gram: {}", summary.gold_price_per_gram);
    println!("Products repriced: {} ({} changed)", summary.repriced, summary.changed);
    println!("Products skipped (no weight): {}", summary.skipped);
    if let Some(output) = &summary.output {
        println!("Saved to: {}", output.display());
    }
    if summary.uploaded {
        println!("Uploaded to marketplace");
    }

    Ok(())
}
