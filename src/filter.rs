//! Continent/country selection and the filter it induces on any table that
//! carries `continent` and `country` columns.

use std::collections::HashSet;
use std::fmt;

use polars::prelude::*;

use crate::dataset::str_values;
use crate::error::Result;
use crate::schema::{location, selection};

/// One selector's state: no filter, or a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Choice {
    #[default]
    All,
    Value(String),
}

impl Choice {
    /// `"All"` is the sentinel; anything else is a concrete value.
    pub fn parse(raw: &str) -> Self {
        if raw == selection::ALL {
            Choice::All
        } else {
            Choice::Value(raw.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Choice::All => None,
            Choice::Value(v) => Some(v.as_str()),
        }
    }
}

impl From<&str> for Choice {
    fn from(raw: &str) -> Self {
        Choice::parse(raw)
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value().unwrap_or(selection::ALL))
    }
}

/// The (continent, country) pair driving every chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FilterSelection {
    pub continent: Choice,
    pub country: Choice,
}

impl FilterSelection {
    pub fn new(continent: impl Into<Choice>, country: impl Into<Choice>) -> Self {
        Self {
            continent: continent.into(),
            country: country.into(),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// Same continent, country reset to `All`.
    pub fn continent_only(&self) -> Self {
        Self {
            continent: self.continent.clone(),
            country: Choice::All,
        }
    }

    /// Row predicate for this selection; `None` means keep everything.
    pub fn predicate(&self) -> Option<Expr> {
        match (self.continent.value(), self.country.value()) {
            (None, None) => None,
            (Some(continent), None) => Some(col(location::CONTINENT).eq(lit(continent))),
            (None, Some(country)) => Some(col(location::COUNTRY).eq(lit(country))),
            (Some(continent), Some(country)) => Some(
                col(location::CONTINENT)
                    .eq(lit(continent))
                    .and(col(location::COUNTRY).eq(lit(country))),
            ),
        }
    }
}

impl fmt::Display for FilterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.continent, self.country)
    }
}

pub fn filter_lazy(lf: LazyFrame, selection: &FilterSelection) -> LazyFrame {
    match selection.predicate() {
        Some(predicate) => lf.filter(predicate),
        None => lf,
    }
}

/// Narrow `df` to the rows matching `selection`. A selection matching nothing
/// yields an empty frame with the same schema.
pub fn filter(df: &DataFrame, selection: &FilterSelection) -> Result<DataFrame> {
    if selection.predicate().is_none() {
        return Ok(df.clone());
    }
    let filtered = filter_lazy(df.clone().lazy(), selection).collect()?;
    tracing::debug!(%selection, rows_in = df.height(), rows_out = filtered.height(), "Filtered table");
    Ok(filtered)
}

// ── Selector options ────────────────────────────────────────────────────────

/// Distinct continents in first-seen order.
pub fn continent_options(df: &DataFrame) -> Result<Vec<String>> {
    distinct_in_order(df, location::CONTINENT)
}

/// Countries offered for a continent choice: every country for `All`,
/// otherwise only that continent's countries. First-seen order.
pub fn country_options(df: &DataFrame, continent: &Choice) -> Result<Vec<String>> {
    let scoped = filter(df, &FilterSelection::new(continent.clone(), Choice::All))?;
    distinct_in_order(&scoped, location::COUNTRY)
}

fn distinct_in_order(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    Ok(str_values(df, column)?
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(v.clone()))
        .collect())
}
