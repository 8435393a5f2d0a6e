use std::fmt;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Serialize, Serializer};

use crate::dataset::{date_values, f64_values, str_values, Datasets};
use crate::error::Result;
use crate::filter::{filter, FilterSelection};
use crate::schema::{derived, location, metrics, testing};

/// Per-column reduction applied inside each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduce {
    Sum,
    Mean,
}

impl Reduce {
    /// Default reduction for a column: rates, ages and population are
    /// averaged, counts are summed.
    pub fn for_column(column: &str) -> Self {
        match column {
            metrics::MEDIAN_AGE
            | metrics::REPRODUCTION_RATE
            | metrics::POPULATION
            | testing::POSITIVE_RATE => Reduce::Mean,
            _ => Reduce::Sum,
        }
    }

    fn expr(self, column: &str) -> Expr {
        let reduced = match self {
            Reduce::Sum => col(column).sum(),
            Reduce::Mean => col(column).mean(),
        };
        reduced.cast(DataType::Float64).alias(column)
    }
}

/// Ordered list of (column, reduction) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReduceSpec {
    entries: Vec<(String, Reduce)>,
}

impl ReduceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each column with its default reduction.
    pub fn defaults(columns: &[&str]) -> Self {
        columns
            .iter()
            .fold(Self::new(), |spec, c| spec.with(c, Reduce::for_column(c)))
    }

    pub fn with(mut self, column: &str, reduce: Reduce) -> Self {
        self.entries.push((column.to_string(), reduce));
        self
    }

    pub fn sum(self, column: &str) -> Self {
        self.with(column, Reduce::Sum)
    }

    pub fn mean(self, column: &str) -> Self {
        self.with(column, Reduce::Mean)
    }

    pub fn columns(&self) -> Vec<String> {
        self.entries.iter().map(|(c, _)| c.clone()).collect()
    }

    fn exprs(&self) -> Vec<Expr> {
        self.entries.iter().map(|(c, r)| r.expr(c)).collect()
    }
}

// ── Grouping ────────────────────────────────────────────────────────────────

/// Which columns a table is grouped by before reducing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimensions {
    None,
    Continent,
    Country,
    Date,
    Year,
    DateContinent,
    DateCountry,
    ContinentDate,
    CountryDate,
    YearContinent,
}

impl GroupDimensions {
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            GroupDimensions::None => &[],
            GroupDimensions::Continent => &[location::CONTINENT],
            GroupDimensions::Country => &[location::COUNTRY],
            GroupDimensions::Date => &[location::DATE],
            GroupDimensions::Year => &[derived::YEAR],
            GroupDimensions::DateContinent => &[location::DATE, location::CONTINENT],
            GroupDimensions::DateCountry => &[location::DATE, location::COUNTRY],
            GroupDimensions::ContinentDate => &[location::CONTINENT, location::DATE],
            GroupDimensions::CountryDate => &[location::COUNTRY, location::DATE],
            GroupDimensions::YearContinent => &[derived::YEAR, location::CONTINENT],
        }
    }

    fn needs_year(self) -> bool {
        matches!(self, GroupDimensions::Year | GroupDimensions::YearContinent)
    }
}

/// The key identifying one group of an aggregated series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    All,
    Label(String),
    Date(NaiveDate),
    Year(i32),
    DateLabel(NaiveDate, String),
    LabelDate(String, NaiveDate),
    YearLabel(i32, String),
}

impl GroupKey {
    pub fn label(&self) -> Option<&str> {
        match self {
            GroupKey::Label(l)
            | GroupKey::DateLabel(_, l)
            | GroupKey::LabelDate(l, _)
            | GroupKey::YearLabel(_, l) => Some(l.as_str()),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            GroupKey::Year(y) | GroupKey::YearLabel(y, _) => Some(*y),
            _ => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("All"),
            GroupKey::Label(l) => f.write_str(l),
            GroupKey::Date(d) => write!(f, "{d}"),
            GroupKey::Year(y) => write!(f, "{y}"),
            GroupKey::DateLabel(d, l) => write!(f, "{d} {l}"),
            GroupKey::LabelDate(l, d) => write!(f, "{l} {d}"),
            GroupKey::YearLabel(y, l) => write!(f, "{y} {l}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: GroupKey,
    /// One value per reduced column, in `ReduceSpec` order.
    pub values: Vec<Option<f64>>,
}

/// Result of one `aggregate` call. Points are sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub dimensions: GroupDimensions,
    pub columns: Vec<String>,
    pub points: Vec<SeriesPoint>,
}

impl AggregatedSeries {
    fn empty(dimensions: GroupDimensions, columns: Vec<String>) -> Self {
        Self {
            dimensions,
            columns,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.points.iter().map(|p| &p.key)
    }

    /// All values of one reduced column, or `None` if it was not reduced.
    pub fn values(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.points.iter().map(|p| p.values[idx]).collect())
    }

    pub fn value_at(&self, key: &GroupKey, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.points
            .iter()
            .find(|p| &p.key == key)
            .and_then(|p| p.values[idx])
    }
}

/// Group `df` by `dimensions` and reduce each column of `spec`.
///
/// Groups whose key contains a null are dropped. Sums skip nulls (an all-null
/// group sums to 0); means skip nulls (an all-null group has no mean).
/// Non-finite results are reported as missing. Empty input gives an empty
/// series for every dimension, including `None`.
pub fn aggregate(
    df: &DataFrame,
    dimensions: GroupDimensions,
    spec: &ReduceSpec,
) -> Result<AggregatedSeries> {
    let columns = spec.columns();
    if df.height() == 0 {
        return Ok(AggregatedSeries::empty(dimensions, columns));
    }

    let mut lf = df.clone().lazy();
    if dimensions.needs_year() {
        lf = lf.with_column(col(location::DATE).dt().year().alias(derived::YEAR));
    }

    let keys = dimensions.key_columns();
    let out = if keys.is_empty() {
        lf.select(spec.exprs()).collect()?
    } else {
        lf.group_by(keys.iter().map(|k| col(*k)).collect::<Vec<_>>())
            .agg(spec.exprs())
            .collect()?
    };

    let group_keys = extract_keys(&out, dimensions)?;
    let value_columns: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| {
            f64_values(&out, c)
                .map(|vals| vals.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
        })
        .collect::<Result<_>>()?;

    let mut points: Vec<SeriesPoint> = group_keys
        .into_iter()
        .enumerate()
        .filter_map(|(row, key)| {
            key.map(|key| SeriesPoint {
                key,
                values: value_columns.iter().map(|vals| vals[row]).collect(),
            })
        })
        .collect();
    points.sort_by(|a, b| a.key.cmp(&b.key));

    tracing::trace!(?dimensions, rows = df.height(), groups = points.len(), "Aggregated");
    Ok(AggregatedSeries {
        dimensions,
        columns,
        points,
    })
}

/// One key per output row; `None` where any key part is null.
fn extract_keys(out: &DataFrame, dimensions: GroupDimensions) -> Result<Vec<Option<GroupKey>>> {
    let keys = match dimensions {
        GroupDimensions::None => vec![Some(GroupKey::All); out.height()],
        GroupDimensions::Continent | GroupDimensions::Country => {
            str_values(out, dimensions.key_columns()[0])?
                .into_iter()
                .map(|l| l.map(GroupKey::Label))
                .collect()
        }
        GroupDimensions::Date => date_values(out, location::DATE)?
            .into_iter()
            .map(|d| d.map(GroupKey::Date))
            .collect(),
        GroupDimensions::Year => year_values(out)?
            .into_iter()
            .map(|y| y.map(GroupKey::Year))
            .collect(),
        GroupDimensions::DateContinent | GroupDimensions::DateCountry => {
            let dates = date_values(out, location::DATE)?;
            let labels = str_values(out, dimensions.key_columns()[1])?;
            dates
                .into_iter()
                .zip(labels)
                .map(|(d, l)| Some(GroupKey::DateLabel(d?, l?)))
                .collect()
        }
        GroupDimensions::ContinentDate | GroupDimensions::CountryDate => {
            let labels = str_values(out, dimensions.key_columns()[0])?;
            let dates = date_values(out, location::DATE)?;
            labels
                .into_iter()
                .zip(dates)
                .map(|(l, d)| Some(GroupKey::LabelDate(l?, d?)))
                .collect()
        }
        GroupDimensions::YearContinent => {
            let years = year_values(out)?;
            let labels = str_values(out, location::CONTINENT)?;
            years
                .into_iter()
                .zip(labels)
                .map(|(y, l)| Some(GroupKey::YearLabel(y?, l?)))
                .collect()
        }
    };
    Ok(keys)
}

fn year_values(out: &DataFrame) -> Result<Vec<Option<i32>>> {
    let years = out.column(derived::YEAR)?.cast(&DataType::Int32)?;
    Ok(years.i32()?.into_iter().collect())
}

// ── Granularity policy ──────────────────────────────────────────────────────

/// The continent → country → date cascade: the finer the selection, the
/// finer the grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Continent,
    Country,
    Date,
}

impl Granularity {
    pub fn from_selection(selection: &FilterSelection) -> Self {
        if !selection.country.is_all() {
            Granularity::Date
        } else if !selection.continent.is_all() {
            Granularity::Country
        } else {
            Granularity::Continent
        }
    }

    pub fn dimensions(self) -> GroupDimensions {
        match self {
            Granularity::Continent => GroupDimensions::Continent,
            Granularity::Country => GroupDimensions::Country,
            Granularity::Date => GroupDimensions::Date,
        }
    }

    /// Location-only grouping: a single country still gets one bar.
    pub fn location_dimensions(self) -> GroupDimensions {
        match self {
            Granularity::Continent => GroupDimensions::Continent,
            Granularity::Country | Granularity::Date => GroupDimensions::Country,
        }
    }

    /// Time-indexed grouping, split by location until a country is fixed.
    pub fn timeline_dimensions(self) -> GroupDimensions {
        match self {
            Granularity::Continent => GroupDimensions::DateContinent,
            Granularity::Country => GroupDimensions::DateCountry,
            Granularity::Date => GroupDimensions::Date,
        }
    }

    pub fn axis_title(self) -> &'static str {
        match self {
            Granularity::Continent | Granularity::Country => "Location",
            Granularity::Date => "Date",
        }
    }
}

// ── Headline counters ───────────────────────────────────────────────────────

/// A headline total. A sum of exactly zero is reported as "not specified",
/// whether it comes from missing data or from genuine zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Counter {
    NotSpecified,
    Total(f64),
}

impl Counter {
    pub fn from_sum(sum: f64) -> Self {
        if sum == 0.0 {
            Counter::NotSpecified
        } else {
            Counter::Total(sum)
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::NotSpecified => f.write_str("not specified"),
            Counter::Total(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Counter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Counter::NotSpecified => serializer.serialize_str("not specified"),
            Counter::Total(v) => serializer.serialize_f64(*v),
        }
    }
}

/// What stood behind a counter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// The selection matched no rows.
    NoRows,
    /// Rows matched but every value was missing.
    NoValues,
    /// At least one value was present.
    Observed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterReading {
    pub value: Counter,
    pub coverage: Coverage,
}

/// Sum one column of an already filtered table into a counter.
pub fn counter(df: &DataFrame, column: &str) -> Result<CounterReading> {
    let values = f64_values(df, column)?;
    let present: Vec<f64> = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    let coverage = if df.height() == 0 {
        Coverage::NoRows
    } else if present.is_empty() {
        Coverage::NoValues
    } else {
        Coverage::Observed
    };

    Ok(CounterReading {
        value: Counter::from_sum(present.iter().sum()),
        coverage,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadlineCounters {
    pub cases: CounterReading,
    pub deaths: CounterReading,
    pub vaccinated: CounterReading,
}

/// The three headline figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Headline {
    Cases,
    Deaths,
    Vaccinated,
}

impl Headline {
    fn source(self, data: &Datasets) -> (&DataFrame, &'static str) {
        match self {
            Headline::Cases => (data.metrics(), metrics::NEW_CASES),
            Headline::Deaths => (data.metrics(), metrics::NEW_DEATHS),
            Headline::Vaccinated => (data.snapshot(), testing::PEOPLE_VACCINATED),
        }
    }
}

/// One headline counter under `selection`. Cases and deaths come from the
/// metrics table, vaccinated from the latest snapshot.
pub fn headline_counter(
    data: &Datasets,
    selection: &FilterSelection,
    headline: Headline,
) -> Result<CounterReading> {
    let (table, column) = headline.source(data);
    counter(&filter(table, selection)?, column)
}

pub fn headline_counters(data: &Datasets, selection: &FilterSelection) -> Result<HeadlineCounters> {
    Ok(HeadlineCounters {
        cases: headline_counter(data, selection, Headline::Cases)?,
        deaths: headline_counter(data, selection, Headline::Deaths)?,
        vaccinated: headline_counter(data, selection, Headline::Vaccinated)?,
    })
}
