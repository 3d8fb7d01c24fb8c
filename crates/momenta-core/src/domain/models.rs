use std::collections::HashSet;

use time::Date;

use crate::{Symbol, ValidationError};

/// One trading day's OHLCV for one ticker.
///
/// Identified by `(symbol, date)`; the store treats that pair as the primary
/// key and freezes the first-seen values on conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: Symbol,
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        symbol: Symbol,
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_price("open", open)?;
        validate_price("high", high)?;
        validate_price("low", low)?;
        validate_price("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            symbol,
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn validate_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

/// The set of tickers in scope for bulk ingestion.
///
/// Supplied by an external collaborator; the sync path only filters against
/// it and never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Universe(HashSet<Symbol>);

impl Universe {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self(symbols.into_iter().collect())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }
}

impl FromIterator<Symbol> for Universe {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    #[test]
    fn accepts_well_formed_bar() {
        let bar = Bar::new(
            symbol("AAA"),
            date!(2025 - 06 - 04),
            10.0,
            11.5,
            9.5,
            11.0,
            125_000,
        )
        .expect("bar should validate");
        assert_eq!(bar.symbol.as_str(), "AAA");
    }

    #[test]
    fn rejects_inverted_range() {
        let err = Bar::new(
            symbol("AAA"),
            date!(2025 - 06 - 04),
            10.0,
            9.0,
            11.0,
            10.0,
            1,
        )
        .expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidBarRange);
    }

    #[test]
    fn rejects_close_outside_bounds() {
        let err = Bar::new(
            symbol("AAA"),
            date!(2025 - 06 - 04),
            10.0,
            11.0,
            9.0,
            12.0,
            1,
        )
        .expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidBarBounds);
    }

    #[test]
    fn rejects_non_finite_price() {
        let err = Bar::new(
            symbol("AAA"),
            date!(2025 - 06 - 04),
            f64::NAN,
            11.0,
            9.0,
            10.0,
            1,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }

    #[test]
    fn universe_filters_membership() {
        let universe: Universe = [symbol("AAA"), symbol("BBB")].into_iter().collect();
        assert!(universe.contains(&symbol("aaa")));
        assert!(!universe.contains(&symbol("CCC")));
        assert_eq!(universe.len(), 2);
    }
}
