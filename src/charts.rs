//! Chart payloads: renderer-agnostic traces built from aggregated series.
//!
//! Each builder filters, aggregates and reshapes; none of them touches shared
//! state. The presentation shell maps `TraceKind` onto its own figure types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregation::{
    aggregate, AggregatedSeries, Granularity, GroupDimensions, GroupKey, ReduceSpec,
};
use crate::dataset::{date_values, f64_values, Datasets};
use crate::dispatch::ChartId;
use crate::error::{DashError, Result};
use crate::filter::{filter, FilterSelection};
use crate::schema::{location, measure, metrics, testing};

/// Marker size per unit of vaccinated share.
pub const BUBBLE_SIZE_SCALE: f64 = 70.0;
/// Marker colour per unit of vaccinated share (a percentage).
pub const BUBBLE_COLOR_SCALE: f64 = 100.0;

// ── Parameters ──────────────────────────────────────────────────────────────

/// The cases/deaths toggle shared by several charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    #[default]
    Cases,
    Deaths,
}

impl Measure {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            measure::CASES => Ok(Measure::Cases),
            measure::DEATHS => Ok(Measure::Deaths),
            _ => Err(DashError::InvalidParameter(format!(
                "measure must be '{}' or '{}', got '{raw}'",
                measure::CASES,
                measure::DEATHS
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Cases => measure::CASES,
            Measure::Deaths => measure::DEATHS,
        }
    }

    pub fn daily_column(self) -> &'static str {
        match self {
            Measure::Cases => metrics::NEW_CASES,
            Measure::Deaths => metrics::NEW_DEATHS,
        }
    }

    pub fn total_column(self) -> &'static str {
        match self {
            Measure::Cases => metrics::TOTAL_CASES,
            Measure::Deaths => metrics::TOTAL_DEATHS,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Measure::Cases => "Cases",
            Measure::Deaths => "Deaths",
        }
    }
}

// ── Payload types ───────────────────────────────────────────────────────────

/// One x coordinate (or choropleth location).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Label(String),
    Date(NaiveDate),
    Year(i32),
    Number(f64),
}

impl AxisValue {
    /// The coarsest readable coordinate of a group key: the date for
    /// time-indexed keys, the label otherwise.
    fn from_key(key: &GroupKey) -> Self {
        match key {
            GroupKey::All => AxisValue::Label("All".to_string()),
            GroupKey::Label(l) => AxisValue::Label(l.clone()),
            GroupKey::Date(d) | GroupKey::DateLabel(d, _) | GroupKey::LabelDate(_, d) => {
                AxisValue::Date(*d)
            }
            GroupKey::Year(y) | GroupKey::YearLabel(y, _) => AxisValue::Year(*y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Bar,
    Line,
    Markers,
    Area,
    Histogram,
    Choropleth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub size: Vec<f64>,
    pub color: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub kind: TraceKind,
    pub x: Vec<AxisValue>,
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

impl Trace {
    fn new(name: &str, kind: TraceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            x: Vec::new(),
            y: Vec::new(),
            text: None,
            stack_group: None,
            marker: None,
        }
    }

    /// One point per group, x from the key, y from `column`.
    fn from_series(
        name: &str,
        kind: TraceKind,
        series: &AggregatedSeries,
        column: &str,
    ) -> Self {
        let mut trace = Self::new(name, kind);
        trace.x = series.keys().map(AxisValue::from_key).collect();
        trace.y = series.values(column).unwrap_or_default();
        trace
    }

    fn with_key_labels(mut self, series: &AggregatedSeries) -> Self {
        self.text = Some(
            series
                .keys()
                .map(|k| k.label().unwrap_or_default().to_string())
                .collect(),
        );
        self
    }

    fn stacked(mut self, group: &str) -> Self {
        self.stack_group = Some(group.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub chart: ChartId,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub traces: Vec<Trace>,
}

impl ChartPayload {
    fn new(chart: ChartId, title: String, x_title: &str, y_title: &str) -> Self {
        Self {
            chart,
            title,
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
            traces: Vec::new(),
        }
    }

    fn with_trace(mut self, trace: Trace) -> Self {
        self.traces.push(trace);
        self
    }
}

// ── Builders ────────────────────────────────────────────────────────────────

/// New cases or deaths summed at the selection's granularity.
pub fn cases_deaths_bar(
    data: &Datasets,
    selection: &FilterSelection,
    measure: Measure,
) -> Result<ChartPayload> {
    let granularity = Granularity::from_selection(selection);
    let rows = filter(data.metrics(), selection)?;
    let column = measure.daily_column();
    let series = aggregate(
        &rows,
        granularity.dimensions(),
        &ReduceSpec::new().sum(column),
    )?;

    Ok(ChartPayload::new(
        ChartId::CasesDeathsBar,
        format!("Total {} per Location", measure.as_str()),
        granularity.axis_title(),
        &format!("Total {}", measure.as_str()),
    )
    .with_trace(Trace::from_series(
        &format!("Total {}", measure.title()),
        TraceKind::Bar,
        &series,
        column,
    )))
}

/// Cumulative cases or deaths over time, summed per date.
pub fn evolution_line(
    data: &Datasets,
    selection: &FilterSelection,
    measure: Measure,
) -> Result<ChartPayload> {
    let rows = filter(data.metrics(), selection)?;
    let column = measure.total_column();
    let series = aggregate(&rows, GroupDimensions::Date, &ReduceSpec::new().sum(column))?;

    Ok(ChartPayload::new(
        ChartId::EvolutionLine,
        format!("Evolution of {} over Time", measure.as_str()),
        "Date",
        &format!("Total {}", measure.as_str()),
    )
    .with_trace(Trace::from_series(
        measure.as_str(),
        TraceKind::Line,
        &series,
        column,
    )))
}

/// Row-level (date, reproduction rate) points; rows without a rate are
/// left out.
pub fn reproduction_scatter(data: &Datasets, selection: &FilterSelection) -> Result<ChartPayload> {
    let rows = filter(data.metrics(), selection)?;
    let dates = date_values(&rows, location::DATE)?;
    let rates = f64_values(&rows, metrics::REPRODUCTION_RATE)?;

    let mut trace = Trace::new("Reproduction Rate", TraceKind::Markers);
    for (date, rate) in dates.into_iter().zip(rates) {
        if let (Some(date), Some(rate)) = (date, rate.filter(|r| r.is_finite())) {
            trace.x.push(AxisValue::Date(date));
            trace.y.push(Some(rate));
        }
    }

    Ok(ChartPayload::new(
        ChartId::ReproductionScatter,
        "Reproduction Rate over Time".to_string(),
        "Date",
        "Reproduction Rate",
    )
    .with_trace(trace))
}

/// Mean median age per continent, or per country once a continent or
/// country is chosen.
pub fn median_age_bar(data: &Datasets, selection: &FilterSelection) -> Result<ChartPayload> {
    let granularity = Granularity::from_selection(selection);
    let rows = filter(data.metrics(), selection)?;
    let series = aggregate(
        &rows,
        granularity.location_dimensions(),
        &ReduceSpec::new().mean(metrics::MEDIAN_AGE),
    )?;

    Ok(ChartPayload::new(
        ChartId::MedianAgeBar,
        "Median Age by Location".to_string(),
        "Location",
        "Median Age",
    )
    .with_trace(Trace::from_series(
        "Median Age",
        TraceKind::Bar,
        &series,
        metrics::MEDIAN_AGE,
    )))
}

/// Positive tests, hospital and ICU patients summed per (location, date).
/// Only the continent choice applies.
pub fn patient_test_breakdown(
    data: &Datasets,
    selection: &FilterSelection,
) -> Result<ChartPayload> {
    let scope = selection.continent_only();
    let dimensions = if scope.continent.is_all() {
        GroupDimensions::ContinentDate
    } else {
        GroupDimensions::CountryDate
    };
    let rows = filter(data.testing(), &scope)?;
    let series = aggregate(
        &rows,
        dimensions,
        &ReduceSpec::new()
            .sum(testing::POSITIVE_TESTS)
            .sum(testing::HOSP_PATIENTS)
            .sum(testing::ICU_PATIENTS),
    )?;

    let mut payload = ChartPayload::new(
        ChartId::PatientTestBreakdown,
        format!(
            "ICU/Hospital/Positive Tests breakdown for {} over Time",
            scope.continent
        ),
        "Date",
        "Count",
    );
    for (name, column) in [
        ("Positive Tests", testing::POSITIVE_TESTS),
        ("Hospitalized Patients", testing::HOSP_PATIENTS),
        ("ICU Patients", testing::ICU_PATIENTS),
    ] {
        payload = payload.with_trace(
            Trace::from_series(name, TraceKind::Bar, &series, column).with_key_labels(&series),
        );
    }
    Ok(payload)
}

/// New cases and deaths per date as two stacked layers.
pub fn cases_deaths_area(data: &Datasets, selection: &FilterSelection) -> Result<ChartPayload> {
    let granularity = Granularity::from_selection(selection);
    let rows = filter(data.metrics(), selection)?;
    let series = aggregate(
        &rows,
        granularity.timeline_dimensions(),
        &ReduceSpec::new()
            .sum(metrics::NEW_CASES)
            .sum(metrics::NEW_DEATHS),
    )?;

    let mut payload = ChartPayload::new(
        ChartId::CasesDeathsArea,
        "New Cases and Deaths by time".to_string(),
        "Date",
        "New cases and deaths",
    );
    for (name, column) in [
        ("New Cases", metrics::NEW_CASES),
        ("New Deaths", metrics::NEW_DEATHS),
    ] {
        let mut trace = Trace::from_series(name, TraceKind::Area, &series, column).stacked("one");
        if granularity.timeline_dimensions() != GroupDimensions::Date {
            trace = trace.with_key_labels(&series);
        }
        payload = payload.with_trace(trace);
    }
    Ok(payload)
}

/// People vaccinated against population, one point per country of the
/// latest snapshot. Only the continent choice applies. Countries with no
/// known population are left out.
pub fn vaccination_bubble(data: &Datasets, selection: &FilterSelection) -> Result<ChartPayload> {
    let scope = selection.continent_only();
    let rows = filter(data.snapshot(), &scope)?;
    let series = aggregate(
        &rows,
        GroupDimensions::Country,
        &ReduceSpec::new()
            .sum(testing::POPULATION)
            .sum(testing::PEOPLE_VACCINATED),
    )?;

    let mut trace = Trace::new("People Vaccinated", TraceKind::Markers);
    let mut names = Vec::new();
    let mut size = Vec::new();
    let mut color = Vec::new();
    for point in &series.points {
        let country = point.key.label().unwrap_or_default();
        let (population, vaccinated) = (point.values[0], point.values[1].unwrap_or(0.0));
        let Some(population) = population.filter(|p| *p > 0.0) else {
            tracing::debug!(country, "Skipping bubble point without population");
            continue;
        };
        let share = vaccinated / population;
        trace.x.push(AxisValue::Number(population));
        trace.y.push(Some(vaccinated));
        names.push(country.to_string());
        size.push(share * BUBBLE_SIZE_SCALE);
        color.push(share * BUBBLE_COLOR_SCALE);
    }
    trace.text = Some(names);
    trace.marker = Some(Marker { size, color });

    Ok(ChartPayload::new(
        ChartId::VaccinationBubble,
        "People Vaccinated vs Population".to_string(),
        "Population",
        "People Vaccinated",
    )
    .with_trace(trace))
}

/// Share of the population (in percent) hit by cases or deaths, per
/// country, over the whole table. Countries without a positive mean
/// population are left out.
pub fn choropleth(data: &Datasets, measure: Measure) -> Result<ChartPayload> {
    let column = measure.daily_column();
    let series = aggregate(
        data.metrics(),
        GroupDimensions::Country,
        &ReduceSpec::new().sum(column).mean(metrics::POPULATION),
    )?;

    let mut trace = Trace::new(measure.as_str(), TraceKind::Choropleth);
    for point in &series.points {
        let country = point.key.label().unwrap_or_default();
        match (point.values[0], point.values[1].filter(|p| *p > 0.0)) {
            (Some(total), Some(population)) => {
                trace.x.push(AxisValue::Label(country.to_string()));
                trace.y.push(Some(total / population * 100.0));
            }
            _ => tracing::debug!(country, "Skipping map value without population"),
        }
    }

    Ok(ChartPayload::new(
        ChartId::Choropleth,
        format!("Percentage of {} in Population by Country", measure.as_str()),
        "Country",
        "Percentage",
    )
    .with_trace(trace))
}

/// New cases summed per year, one overlapping trace per continent.
pub fn yearly_histogram(data: &Datasets) -> Result<ChartPayload> {
    let series = aggregate(
        data.metrics(),
        GroupDimensions::YearContinent,
        &ReduceSpec::new().sum(metrics::NEW_CASES),
    )?;

    let mut continents: Vec<&str> = series.keys().filter_map(GroupKey::label).collect();
    continents.sort_unstable();
    continents.dedup();

    let mut payload = ChartPayload::new(
        ChartId::YearlyHistogram,
        "Total cases per Location".to_string(),
        "Year",
        "Total cases",
    );
    for continent in continents {
        let mut trace = Trace::new(continent, TraceKind::Histogram);
        for point in series.points.iter().filter(|p| p.key.label() == Some(continent)) {
            if let Some(year) = point.key.year() {
                trace.x.push(AxisValue::Year(year));
                trace.y.push(point.values[0]);
            }
        }
        payload = payload.with_trace(trace);
    }
    Ok(payload)
}
