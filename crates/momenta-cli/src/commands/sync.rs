use std::fs;
use std::path::Path;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use momenta_core::{
    ApiKey, BarFetcher, BarStore, CancelToken, Clock, PolygonFetcher, ReqwestHttpClient, Symbol,
    SyncConfig, SyncOrchestrator, SystemClock, ThrottleGate, Universe,
};

use crate::cli::SyncArgs;
use crate::error::CliError;

pub async fn run(args: &SyncArgs) -> Result<(), CliError> {
    let api_key = std::env::var("MOMENTA_POLYGON_API_KEY")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(CliError::MissingApiKey)?;

    let as_of = match &args.as_of {
        Some(raw) => super::parse_date(raw)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let universe = load_universe(&args.universe)?;
    let benchmark = Symbol::parse(&args.benchmark)?;
    let warehouse = super::open_warehouse(args.db.as_deref())?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gate = ThrottleGate::polygon_free_tier(Arc::clone(&clock));
    let fetcher: Arc<dyn BarFetcher> = Arc::new(PolygonFetcher::new(
        Arc::new(ReqwestHttpClient::new()),
        gate,
        clock,
        ApiKey::polygon(api_key),
    ));
    let store: Arc<dyn BarStore> = Arc::new(warehouse);
    let config = SyncConfig {
        benchmark,
        max_weekday_lookback: args.lookback,
        coverage_threshold: args.coverage_threshold,
    };
    let orchestrator = SyncOrchestrator::new(fetcher, store, config);

    let run_id = Uuid::new_v4();
    let cancel = CancelToken::new();
    tracing::info!(%run_id, %as_of, universe = universe.len(), "sync starting");

    let resolved = orchestrator.sync(as_of, &universe, &cancel).await?;

    println!("resolved trading date: {resolved}");
    Ok(())
}

fn load_universe(path: &Path) -> Result<Universe, CliError> {
    let contents = fs::read_to_string(path)?;
    let mut symbols = Vec::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line
            .split('#')
            .next()
            .unwrap_or_default()
            .trim();
        if line.is_empty() {
            continue;
        }

        let symbol = Symbol::parse(line).map_err(|source| CliError::UniverseEntry {
            path: path.display().to_string(),
            line: index + 1,
            source,
        })?;
        symbols.push(symbol);
    }

    Ok(Universe::new(symbols))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_universe_skipping_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# momentum cohort").expect("write");
        writeln!(file, "AAPL").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "brk.b  # share class B").expect("write");
        file.flush().expect("flush");

        let universe = load_universe(file.path()).expect("universe loads");
        assert_eq!(universe.len(), 2);
        assert!(universe.contains(&Symbol::parse("AAPL").expect("valid")));
        assert!(universe.contains(&Symbol::parse("BRK.B").expect("valid")));
    }

    #[test]
    fn bad_entry_reports_line_number() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "AAPL").expect("write");
        writeln!(file, "7UP!").expect("write");
        file.flush().expect("flush");

        let err = load_universe(file.path()).expect_err("must fail");
        match err {
            CliError::UniverseEntry { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
