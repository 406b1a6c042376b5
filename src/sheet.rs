//! Marketplace product sheet: load, locate columns, write prices back, save.
//!
//! Both `.xlsx` (the marketplace export format) and `.csv` are supported.
//! Cell values, their positions and worksheet names survive an xlsx round
//! trip; formatting is not preserved.

use crate::config::SheetColumns;
use crate::debug_println;
use crate::models::ProductRecord;
use crate::weight::parse_localized_number;
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Cell value as text; integral numbers are written without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Cell value as a whole price, accepting thousands separators in text.
    pub fn as_price(&self) -> Option<i64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(n.round() as i64),
            Cell::Text(s) => {
                let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | '٬' | ' ')).collect();
                parse_localized_number(&cleaned).map(|n| n.round() as i64)
            }
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Where the product columns live in a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub header_row: usize,
    pub id: usize,
    pub title: usize,
    pub price: usize,
    pub buy_box_price: Option<usize>,
}

/// The product worksheet. `rows[0][0]` sits at `origin` (zero-based row,
/// column) in the workbook; layout indices are relative to `rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSheet {
    pub name: Option<String>,
    pub origin: (u32, u32),
    pub rows: Vec<Vec<Cell>>,
    /// Remaining worksheets of the workbook, carried through unchanged.
    pub other_sheets: Vec<ProductSheet>,
}

impl ProductSheet {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        match extension(path).as_str() {
            "csv" => Self::load_csv(path),
            "xlsx" | "xlsm" | "xls" | "ods" => Self::load_workbook(path),
            other => bail!("Unsupported sheet format '{}': {}", other, path.display()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match extension(path).as_str() {
            "csv" => self.save_csv(path),
            "xlsx" => self.save_xlsx(path),
            other => bail!("Cannot write sheet format '{}': {}", other, path.display()),
        }
    }

    fn load_workbook(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .context(format!("Failed to open workbook: {}", path.display()))?;
        let mut sheets = workbook
            .worksheets()
            .into_iter()
            .map(|(name, range)| {
                // Ranges start at the first used cell, not at A1.
                let origin = range.start().unwrap_or((0, 0));
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(Cell::from).collect())
                    .collect::<Vec<Vec<Cell>>>();
                Self {
                    name: Some(name),
                    origin,
                    rows,
                    other_sheets: Vec::new(),
                }
            })
            .collect::<Vec<Self>>()
            .into_iter();

        let mut sheet = sheets
            .next()
            .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?;
        sheet.other_sheets = sheets.collect();

        debug_println!(
            "Loaded {} rows from sheet {:?} at {:?} in {}",
            sheet.rows.len(),
            sheet.name,
            sheet.origin,
            path.display()
        );
        Ok(sheet)
    }

    fn load_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("Failed to open input file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }
        debug_println!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Self::from_rows(rows))
    }

    fn save_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .context(format!("Failed to create output file: {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::as_text))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn save_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();

        for sheet in std::iter::once(self).chain(self.other_sheets.iter()) {
            let worksheet = workbook.add_worksheet();
            if let Some(name) = &sheet.name {
                worksheet.set_name(name)?;
            }
            sheet.write_cells(worksheet)?;
        }

        workbook
            .save(path)
            .context(format!("Failed to write workbook: {}", path.display()))?;
        Ok(())
    }

    fn write_cells(&self, worksheet: &mut Worksheet) -> Result<()> {
        let (row_offset, col_offset) = self.origin;

        for (r, row) in self.rows.iter().enumerate() {
            let r = u32::try_from(r)
                .ok()
                .and_then(|r| r.checked_add(row_offset))
                .context("Sheet has too many rows")?;
            for (c, cell) in row.iter().enumerate() {
                let c = u32::try_from(c)
                    .ok()
                    .and_then(|c| c.checked_add(col_offset))
                    .and_then(|c| u16::try_from(c).ok())
                    .context("Sheet has too many columns")?;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finds the header row (the first row holding the price header) and the
    /// product columns in it.
    pub fn locate_columns(&self, columns: &SheetColumns) -> Result<ColumnLayout> {
        for (row_index, row) in self.rows.iter().enumerate() {
            let find = |header: &str| row.iter().position(|cell| cell.as_text() == header.trim());

            let Some(price) = find(&columns.price) else {
                continue;
            };
            let id = find(&columns.id)
                .ok_or_else(|| anyhow!("Column '{}' not found in header row", columns.id))?;
            let title = find(&columns.title)
                .ok_or_else(|| anyhow!("Column '{}' not found in header row", columns.title))?;
            let buy_box_price = columns.buy_box_price.as_deref().and_then(find);

            return Ok(ColumnLayout {
                header_row: row_index,
                id,
                title,
                price,
                buy_box_price,
            });
        }
        bail!("Price column '{}' not found in sheet", columns.price)
    }

    pub fn products(&self, layout: &ColumnLayout) -> Vec<ProductRecord> {
        self.rows
            .iter()
            .skip(layout.header_row + 1)
            .filter_map(|row| {
                let id = cell_at(row, layout.id);
                if id.is_empty() {
                    return None;
                }
                Some(ProductRecord {
                    id: id.as_text(),
                    title: cell_at(row, layout.title).as_text(),
                    old_price: cell_at(row, layout.price).as_price(),
                })
            })
            .collect()
    }

    /// Writes new prices into the price (and buy-box price) column. Returns
    /// the number of rows updated.
    pub fn apply_prices(&mut self, layout: &ColumnLayout, prices: &HashMap<String, i64>) -> usize {
        let mut updated = 0;

        for row in self.rows.iter_mut().skip(layout.header_row + 1) {
            let id = cell_at(row, layout.id).as_text();
            let Some(&price) = prices.get(&id) else {
                continue;
            };

            set_cell(row, layout.price, Cell::Number(price as f64));
            if let Some(col) = layout.buy_box_price {
                set_cell(row, col, Cell::Number(price as f64));
            }
            updated += 1;
        }

        updated
    }
}

fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&Cell::Empty)
}

fn set_cell(row: &mut Vec<Cell>, index: usize, cell: Cell) {
    if row.len() <= index {
        row.resize(index + 1, Cell::Empty);
    }
    row[index] = cell;
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}
