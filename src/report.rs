use crate::models::PriceUpdate;
use crate::repricer::RepriceResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Formats a whole amount with thousands separators, e.g. `9,660,564`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// `+50,000 (+5.0%)`, or `None` without an old price.
pub fn format_diff(update: &PriceUpdate) -> Option<String> {
    let diff = update.diff()?;
    let percent = update.diff_percent().unwrap_or(0.0);
    let sign = if diff >= 0 { "+" } else { "" };
    Some(format!("{}{} ({}{:.1}%)", sign, format_amount(diff), sign, percent))
}

pub fn print_header(gold_price_per_gram: f64, source: &str) -> io::Result<()> {
    execute!(
        io::stdout(),
        SetForegroundColor(Color::White),
        Print(format!(
            "💰 Gold price per gram: {} ({})\n",
            format_amount(gold_price_per_gram.round() as i64),
            source
        )),
        ResetColor
    )
}

pub fn print_update(update: &PriceUpdate) -> io::Result<()> {
    let mut stdout = io::stdout();

    execute!(
        stdout,
        SetForegroundColor(Color::White),
        Print(format!("{}\n", update.title)),
        SetForegroundColor(Color::DarkGrey),
        Print(format!(
            "   weight: {} g, labor: {}%\n",
            update.weight, update.labor_percentage
        )),
        ResetColor
    )?;

    if let Some(old) = update.old_price {
        execute!(
            stdout,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("   old price: {}\n", format_amount(old))),
            ResetColor
        )?;
    }

    let color = match update.diff() {
        Some(d) if d > 0 => Color::Green,
        Some(d) if d < 0 => Color::Red,
        Some(_) => Color::DarkGrey,
        None => Color::White,
    };
    let diff = format_diff(update)
        .map(|d| format!("  {}", d))
        .unwrap_or_default();

    execute!(
        stdout,
        SetForegroundColor(color),
        Print(format!("   new price: {}{}\n\n", format_amount(update.new_price), diff)),
        ResetColor
    )
}

pub fn print_summary(result: &RepriceResult) -> io::Result<()> {
    execute!(
        io::stdout(),
        SetForegroundColor(Color::Green),
        Print(format!(
            "✅ Repriced {} products ({} changed)\n",
            result.updates.len(),
            result.changed_count()
        )),
        ResetColor
    )?;

    if !result.skipped.is_empty() {
        execute!(
            io::stdout(),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "⚠ Skipped {} products without a weight in the title\n",
                result.skipped.len()
            )),
            ResetColor
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChangeLogRow<'a> {
    timestamp: String,
    gold_price_per_gram: f64,
    product_id: &'a str,
    title: &'a str,
    weight: f64,
    labor_percentage: u32,
    old_price: Option<i64>,
    new_price: i64,
    diff: Option<i64>,
}

/// Appends the updates to a CSV change log, writing a header for a new file.
pub fn append_change_log(
    updates: &[PriceUpdate],
    gold_price_per_gram: f64,
    at: DateTime<Local>,
    path: &Path,
) -> Result<()> {
    let file_exists = path.exists() && path.metadata().map(|m| m.len() > 0).unwrap_or(false);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open change log: {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let timestamp = at.to_rfc3339();
    for update in updates {
        writer.serialize(ChangeLogRow {
            timestamp: timestamp.clone(),
            gold_price_per_gram,
            product_id: &update.product_id,
            title: &update.title,
            weight: update.weight,
            labor_percentage: update.labor_percentage,
            old_price: update.old_price,
            new_price: update.new_price,
            diff: update.diff(),
        })?;
    }

    writer.flush()?;
    Ok(())
}
