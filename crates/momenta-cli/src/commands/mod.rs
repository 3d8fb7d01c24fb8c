mod coverage;
mod sync;

use std::path::Path;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use momenta_core::{Warehouse, WarehouseConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Sync(args) => sync::run(args).await,
        Command::Coverage(args) => coverage::run(args),
    }
}

fn parse_date(raw: &str) -> Result<Date, CliError> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|_| CliError::InvalidDate {
        value: raw.to_owned(),
    })
}

fn open_warehouse(db: Option<&Path>) -> Result<Warehouse, CliError> {
    let config = match db {
        Some(path) => WarehouseConfig::at_path(path),
        None => WarehouseConfig::default(),
    };
    Warehouse::open(config).map_err(CliError::from)
}
