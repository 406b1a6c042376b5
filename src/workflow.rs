//! End-to-end price synchronization run.

use crate::config::{AppConfig, PricingConfig, SheetColumns};
use crate::debug_println;
use crate::marketplace::{wait_for_export, ExportRequestOutcome, SnappshopClient};
use crate::report;
use crate::repricer::{reprice_all, RepriceResult};
use crate::sheet::ProductSheet;
use crate::spot_price::build_chain;
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Reprice this local sheet instead of requesting a fresh export.
    pub input: Option<PathBuf>,
    /// Where to write the repriced sheet; a timestamped name is used if unset.
    pub output: Option<PathBuf>,
    /// Directory for downloaded exports and generated sheets.
    pub work_dir: PathBuf,
    pub gold_price_override: Option<f64>,
    pub change_log: Option<PathBuf>,
    pub upload: bool,
    /// Calculate and report only; write nothing.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            work_dir: PathBuf::from("."),
            gold_price_override: None,
            change_log: None,
            upload: true,
            dry_run: false,
        }
    }
}

#[derive(Debug)]
pub struct SyncSummary {
    pub gold_price_per_gram: f64,
    pub repriced: usize,
    pub changed: usize,
    pub skipped: usize,
    pub output: Option<PathBuf>,
    pub uploaded: bool,
}

pub fn run_sync(config: &AppConfig, options: &SyncOptions) -> Result<SyncSummary> {
    check_upload_format(options)?;

    let needs_client = options.input.is_none() || (options.upload && !options.dry_run);
    let client = if needs_client {
        Some(SnappshopClient::new(&config.marketplace)?)
    } else {
        None
    };

    let input = match &options.input {
        Some(path) => {
            if !path.exists() {
                bail!("File not found: {}", path.display());
            }
            path.clone()
        }
        None => {
            let client = client.as_ref().context("Marketplace client unavailable")?;
            fetch_export(client, config, &options.work_dir)?
        }
    };

    let chain = build_chain(&config.spot_price, options.gold_price_override)?;
    let (gold_price, source) = chain.resolve()?;
    report::print_header(gold_price, &source)?;

    println!("📊 Reading sheet: {}", input.display());
    let mut sheet = ProductSheet::load(&input)?;
    let result = reprice_sheet(&mut sheet, gold_price, &config.pricing, &config.columns)?;

    for update in &result.updates {
        report::print_update(update)?;
    }
    report::print_summary(&result)?;

    let mut summary = SyncSummary {
        gold_price_per_gram: gold_price,
        repriced: result.updates.len(),
        changed: result.changed_count(),
        skipped: result.skipped.len(),
        output: None,
        uploaded: false,
    };

    if options.dry_run {
        println!("Dry run, nothing written.");
        return Ok(summary);
    }

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&options.work_dir));
    sheet.save(&output)?;
    println!("✅ Saved repriced sheet to {}", output.display());
    summary.output = Some(output.clone());

    if let Some(log) = &options.change_log {
        report::append_change_log(&result.updates, gold_price, Local::now(), log)?;
        debug_println!("Appended {} rows to change log {}", result.updates.len(), log.display());
    }

    if options.upload {
        if let Some(client) = &client {
            client.upload_import(&output)?;
            println!("✅ Uploaded {} to the marketplace", output.display());
            summary.uploaded = true;
        }
    }

    Ok(summary)
}

/// Reprices every product in `sheet` and writes the new prices into it.
pub fn reprice_sheet(
    sheet: &mut ProductSheet,
    gold_price_per_gram: f64,
    pricing: &PricingConfig,
    columns: &SheetColumns,
) -> Result<RepriceResult> {
    let layout = sheet.locate_columns(columns)?;
    let products = sheet.products(&layout);
    debug_println!("Found {} products, header at row {}", products.len(), layout.header_row);

    let result = reprice_all(&products, gold_price_per_gram, pricing);
    let written = sheet.apply_prices(&layout, &result.price_map());
    debug_println!("Wrote {} prices into the sheet", written);

    Ok(result)
}

fn fetch_export(client: &SnappshopClient, config: &AppConfig, work_dir: &Path) -> Result<PathBuf> {
    match client.request_export()? {
        ExportRequestOutcome::Created => println!("Export requested"),
        ExportRequestOutcome::AlreadyRequested => {
            println!("An export was already requested, waiting for it")
        }
    }

    let file_url = wait_for_export(
        client,
        Duration::from_secs(config.marketplace.poll_interval_secs),
        config.marketplace.max_polls,
    )?;
    println!("Export ready: {}", file_url);

    let dest = work_dir.join("inventory_products.xlsx");
    let path = client
        .download_export(&file_url, &dest)
        .context("Failed to fetch marketplace export")?;
    println!("Downloaded export to {}", path.display());
    Ok(path)
}

/// The import endpoint only accepts xlsx workbooks.
pub fn check_upload_format(options: &SyncOptions) -> Result<()> {
    if !options.upload || options.dry_run {
        return Ok(());
    }
    if let Some(output) = &options.output {
        let is_xlsx = output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if !is_xlsx {
            bail!(
                "Cannot upload {}: the marketplace import only accepts .xlsx (use --no-upload to keep a local copy)",
                output.display()
            );
        }
    }
    Ok(())
}

fn default_output_path(work_dir: &Path) -> PathBuf {
    work_dir.join(format!(
        "inventory_products_{}.xlsx",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}
