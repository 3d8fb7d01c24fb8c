use crate::cli::CoverageArgs;
use crate::error::CliError;

pub fn run(args: &CoverageArgs) -> Result<(), CliError> {
    let date = super::parse_date(&args.date)?;
    let warehouse = super::open_warehouse(args.db.as_deref())?;

    let count = warehouse.count_bars_on(&date.to_string())?;
    println!("{date}: {count} bars stored");
    Ok(())
}
