use anyhow::{bail, Result};
use clap::Parser;
use gold_repricer::config::{DEFAULT_LABOR_PERCENTAGE, DEFAULT_SHOP_PROFIT_PERCENTAGE, DEFAULT_TAX_PERCENTAGE};
use gold_repricer::pricing::{calculate_breakdown, PricingInput, TaxBase};
use gold_repricer::report::format_amount;
use gold_repricer::weight::extract_weight;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Calculate the retail price of a single gold item")]
struct Args {
    /// Gold price per gram
    #[clap(short, long)]
    gold_price: f64,

    /// Weight in grams
    #[clap(short, long, conflicts_with = "title")]
    weight: Option<f64>,

    /// Product title to extract the weight from
    #[clap(short, long)]
    title: Option<String>,

    /// Labor percentage
    #[clap(short, long, default_value_t = DEFAULT_LABOR_PERCENTAGE as f64)]
    labor: f64,

    /// Shop profit percentage
    #[clap(short, long, default_value_t = DEFAULT_SHOP_PROFIT_PERCENTAGE)]
    profit: f64,

    /// Tax percentage
    #[clap(long, default_value_t = DEFAULT_TAX_PERCENTAGE)]
    tax: f64,

    /// Amount the tax applies to (full | labor_and_profit_only)
    #[clap(long, default_value = "full")]
    tax_base: TaxBase,

    /// Print every intermediate amount
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let weight = match (args.weight, args.title.as_deref()) {
        (Some(weight), _) => weight,
        (None, Some(title)) => match extract_weight(title) {
            Some(weight) => weight,
            None => bail!("No weight found in title: {}", title),
        },
        (None, None) => bail!("Either --weight or --title is required"),
    };

    let input = PricingInput {
        weight,
        gold_price_per_gram: args.gold_price,
        labor_percentage: args.labor,
        shop_profit_percentage: args.profit,
        tax_percentage: args.tax,
    };
    input.validate()?;

    let breakdown = calculate_breakdown(&input, args.tax_base);

    if args.verbose {
        println!("weight:      {} g", weight);
        println!("gold value:  {:.0}", breakdown.base_price);
        println!("labor:       {:.0}", breakdown.labor_cost);
        println!("shop profit: {:.0}", breakdown.shop_profit);
        println!("tax ({}):  {:.0}", args.tax_base, breakdown.tax);
    }
    println!("{}", format_amount(breakdown.total));

    Ok(())
}
