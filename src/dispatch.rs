//! Chart dispatch and stale-result discarding.
//!
//! Every dashboard panel has a `ChartId`; the dispatch table maps each id to
//! a pure render function of (datasets, selection, params). `Dashboard`
//! owns the datasets and a generation counter so that a refresh overtaken by
//! a newer selection is dropped instead of published.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::aggregation::{headline_counter, CounterReading, Headline};
use crate::charts::{self, ChartPayload, Measure};
use crate::config::DashboardConfig;
use crate::dataset::Datasets;
use crate::error::{DashError, Result};
use crate::filter::{self, Choice, FilterSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    CasesCounter,
    DeathsCounter,
    VaccinatedCounter,
    CasesDeathsBar,
    EvolutionLine,
    ReproductionScatter,
    MedianAgeBar,
    PatientTestBreakdown,
    CasesDeathsArea,
    VaccinationBubble,
    Choropleth,
    YearlyHistogram,
}

impl ChartId {
    pub const ALL: [ChartId; 12] = [
        ChartId::CasesCounter,
        ChartId::DeathsCounter,
        ChartId::VaccinatedCounter,
        ChartId::CasesDeathsBar,
        ChartId::EvolutionLine,
        ChartId::ReproductionScatter,
        ChartId::MedianAgeBar,
        ChartId::PatientTestBreakdown,
        ChartId::CasesDeathsArea,
        ChartId::VaccinationBubble,
        ChartId::Choropleth,
        ChartId::YearlyHistogram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartId::CasesCounter => "cases_counter",
            ChartId::DeathsCounter => "deaths_counter",
            ChartId::VaccinatedCounter => "vaccinated_counter",
            ChartId::CasesDeathsBar => "cases_deaths_bar",
            ChartId::EvolutionLine => "evolution_line",
            ChartId::ReproductionScatter => "reproduction_scatter",
            ChartId::MedianAgeBar => "median_age_bar",
            ChartId::PatientTestBreakdown => "patient_test_breakdown",
            ChartId::CasesDeathsArea => "cases_deaths_area",
            ChartId::VaccinationBubble => "vaccination_bubble",
            ChartId::Choropleth => "choropleth",
            ChartId::YearlyHistogram => "yearly_histogram",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == raw)
            .ok_or_else(|| DashError::UnknownChart(raw.to_string()))
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three cases/deaths toggles of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartParams {
    #[serde(default)]
    pub bar_measure: Measure,
    #[serde(default)]
    pub evolution_measure: Measure,
    #[serde(default)]
    pub map_measure: Measure,
}

impl ChartParams {
    /// Same measure for every toggle.
    pub fn uniform(measure: Measure) -> Self {
        Self {
            bar_measure: measure,
            evolution_measure: measure,
            map_measure: measure,
        }
    }
}

/// Output of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Panel {
    Counter {
        chart: ChartId,
        #[serde(flatten)]
        reading: CounterReading,
    },
    Chart(ChartPayload),
}

impl Panel {
    pub fn chart_id(&self) -> ChartId {
        match self {
            Panel::Counter { chart, .. } => *chart,
            Panel::Chart(payload) => payload.chart,
        }
    }
}

// ── Dispatch table ──────────────────────────────────────────────────────────

type RenderFn = fn(&Datasets, &FilterSelection, &ChartParams) -> Result<Panel>;

static DISPATCH: &[(ChartId, RenderFn)] = &[
    (ChartId::CasesCounter, render_cases_counter),
    (ChartId::DeathsCounter, render_deaths_counter),
    (ChartId::VaccinatedCounter, render_vaccinated_counter),
    (ChartId::CasesDeathsBar, render_cases_deaths_bar),
    (ChartId::EvolutionLine, render_evolution_line),
    (ChartId::ReproductionScatter, render_reproduction_scatter),
    (ChartId::MedianAgeBar, render_median_age_bar),
    (ChartId::PatientTestBreakdown, render_patient_test_breakdown),
    (ChartId::CasesDeathsArea, render_cases_deaths_area),
    (ChartId::VaccinationBubble, render_vaccination_bubble),
    (ChartId::Choropleth, render_choropleth),
    (ChartId::YearlyHistogram, render_yearly_histogram),
];

pub fn render(
    data: &Datasets,
    chart: ChartId,
    selection: &FilterSelection,
    params: &ChartParams,
) -> Result<Panel> {
    let (_, render_fn) = DISPATCH
        .iter()
        .find(|(id, _)| *id == chart)
        .ok_or_else(|| DashError::UnknownChart(chart.to_string()))?;
    render_fn(data, selection, params)
}

fn render_cases_counter(data: &Datasets, sel: &FilterSelection, _: &ChartParams) -> Result<Panel> {
    counter_panel(data, sel, ChartId::CasesCounter, Headline::Cases)
}

fn render_deaths_counter(data: &Datasets, sel: &FilterSelection, _: &ChartParams) -> Result<Panel> {
    counter_panel(data, sel, ChartId::DeathsCounter, Headline::Deaths)
}

fn render_vaccinated_counter(
    data: &Datasets,
    sel: &FilterSelection,
    _: &ChartParams,
) -> Result<Panel> {
    counter_panel(data, sel, ChartId::VaccinatedCounter, Headline::Vaccinated)
}

fn counter_panel(
    data: &Datasets,
    sel: &FilterSelection,
    chart: ChartId,
    headline: Headline,
) -> Result<Panel> {
    Ok(Panel::Counter {
        chart,
        reading: headline_counter(data, sel, headline)?,
    })
}

fn render_cases_deaths_bar(data: &Datasets, sel: &FilterSelection, p: &ChartParams) -> Result<Panel> {
    charts::cases_deaths_bar(data, sel, p.bar_measure).map(Panel::Chart)
}

fn render_evolution_line(data: &Datasets, sel: &FilterSelection, p: &ChartParams) -> Result<Panel> {
    charts::evolution_line(data, sel, p.evolution_measure).map(Panel::Chart)
}

fn render_reproduction_scatter(
    data: &Datasets,
    sel: &FilterSelection,
    _: &ChartParams,
) -> Result<Panel> {
    charts::reproduction_scatter(data, sel).map(Panel::Chart)
}

fn render_median_age_bar(data: &Datasets, sel: &FilterSelection, _: &ChartParams) -> Result<Panel> {
    charts::median_age_bar(data, sel).map(Panel::Chart)
}

fn render_patient_test_breakdown(
    data: &Datasets,
    sel: &FilterSelection,
    _: &ChartParams,
) -> Result<Panel> {
    charts::patient_test_breakdown(data, sel).map(Panel::Chart)
}

fn render_cases_deaths_area(data: &Datasets, sel: &FilterSelection, _: &ChartParams) -> Result<Panel> {
    charts::cases_deaths_area(data, sel).map(Panel::Chart)
}

fn render_vaccination_bubble(
    data: &Datasets,
    sel: &FilterSelection,
    _: &ChartParams,
) -> Result<Panel> {
    charts::vaccination_bubble(data, sel).map(Panel::Chart)
}

fn render_choropleth(data: &Datasets, _: &FilterSelection, p: &ChartParams) -> Result<Panel> {
    charts::choropleth(data, p.map_measure).map(Panel::Chart)
}

fn render_yearly_histogram(data: &Datasets, _: &FilterSelection, _: &ChartParams) -> Result<Panel> {
    charts::yearly_histogram(data).map(Panel::Chart)
}

// ── Refresh gate ────────────────────────────────────────────────────────────

/// Identifies one dispatched selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic generation counter; only the latest ticket is current.
#[derive(Debug, Default)]
pub struct RefreshGate {
    generation: AtomicU64,
}

impl RefreshGate {
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "panels", rename_all = "snake_case")]
pub enum Refresh {
    Panels(Vec<Panel>),
    /// A newer selection was dispatched; these results were discarded.
    Superseded,
}

/// Loaded datasets plus the refresh gate.
#[derive(Debug)]
pub struct Dashboard {
    data: Datasets,
    gate: RefreshGate,
}

impl Dashboard {
    pub fn new(data: Datasets) -> Self {
        Self {
            data,
            gate: RefreshGate::default(),
        }
    }

    pub fn load(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(Datasets::load(config)?))
    }

    pub fn data(&self) -> &Datasets {
        &self.data
    }

    pub fn render(
        &self,
        chart: ChartId,
        selection: &FilterSelection,
        params: &ChartParams,
    ) -> Result<Panel> {
        render(&self.data, chart, selection, params)
    }

    /// Register a new selection; any refresh holding an older ticket will
    /// discard its results.
    pub fn begin(&self) -> Ticket {
        self.gate.begin()
    }

    /// Recompute every panel for a fresh selection.
    pub fn refresh(&self, selection: &FilterSelection, params: &ChartParams) -> Result<Refresh> {
        let ticket = self.begin();
        self.refresh_with(ticket, selection, params)
    }

    /// Recompute every panel under an existing ticket, stopping as soon as the
    /// ticket is no longer current.
    pub fn refresh_with(
        &self,
        ticket: Ticket,
        selection: &FilterSelection,
        params: &ChartParams,
    ) -> Result<Refresh> {
        let mut panels = Vec::with_capacity(ChartId::ALL.len());
        for chart in ChartId::ALL {
            if !self.gate.is_current(ticket) {
                tracing::debug!(%selection, "Refresh superseded");
                return Ok(Refresh::Superseded);
            }
            panels.push(self.render(chart, selection, params)?);
        }
        if !self.gate.is_current(ticket) {
            tracing::debug!(%selection, "Refresh superseded");
            return Ok(Refresh::Superseded);
        }
        Ok(Refresh::Panels(panels))
    }

    pub fn continent_options(&self) -> Result<Vec<String>> {
        filter::continent_options(self.data.metrics())
    }

    pub fn country_options(&self, continent: &Choice) -> Result<Vec<String>> {
        filter::country_options(self.data.metrics(), continent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Counter;
    use crate::fixtures;

    #[test]
    fn every_chart_has_a_render_fn() {
        for id in ChartId::ALL {
            assert!(DISPATCH.iter().any(|(d, _)| *d == id), "{id}");
        }
        assert_eq!(DISPATCH.len(), ChartId::ALL.len());
    }

    #[test]
    fn chart_id_round_trips_through_its_name() {
        for id in ChartId::ALL {
            assert_eq!(ChartId::parse(id.as_str()).unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), id.as_str());
        }
        assert!(matches!(
            ChartId::parse("pie"),
            Err(DashError::UnknownChart(_))
        ));
    }

    #[test]
    fn renders_counter_panel() {
        let dash = Dashboard::new(fixtures::datasets());
        let panel = dash
            .render(
                ChartId::CasesCounter,
                &FilterSelection::new("Europe", "All"),
                &ChartParams::default(),
            )
            .unwrap();
        match panel {
            Panel::Counter { chart, reading } => {
                assert_eq!(chart, ChartId::CasesCounter);
                assert_eq!(reading.value, Counter::Total(650.0));
            }
            other => panic!("expected counter, got {other:?}"),
        }
    }

    #[test]
    fn counter_panels_match_headline_counters() {
        let dash = Dashboard::new(fixtures::datasets());
        let sel = FilterSelection::new("All", "France");
        let expected = crate::aggregation::headline_counters(dash.data(), &sel).unwrap();

        let reading = |id| match dash.render(id, &sel, &ChartParams::default()).unwrap() {
            Panel::Counter { reading, .. } => reading,
            other => panic!("expected counter, got {other:?}"),
        };
        assert_eq!(reading(ChartId::CasesCounter), expected.cases);
        assert_eq!(reading(ChartId::DeathsCounter), expected.deaths);
        assert_eq!(reading(ChartId::VaccinatedCounter), expected.vaccinated);
    }

    #[test]
    fn params_route_to_the_right_chart() {
        let dash = Dashboard::new(fixtures::datasets());
        let params = ChartParams {
            map_measure: Measure::Deaths,
            ..ChartParams::default()
        };
        let panel = dash
            .render(ChartId::Choropleth, &FilterSelection::all(), &params)
            .unwrap();
        let Panel::Chart(payload) = panel else {
            panic!("expected chart");
        };
        assert!(payload.title.contains("deaths"));
    }

    #[test]
    fn refresh_renders_every_panel_in_order() {
        let dash = Dashboard::new(fixtures::datasets());
        let refresh = dash
            .refresh(&FilterSelection::new("Europe", "All"), &ChartParams::default())
            .unwrap();
        let Refresh::Panels(panels) = refresh else {
            panic!("fresh ticket must not be superseded");
        };
        let ids: Vec<ChartId> = panels.iter().map(Panel::chart_id).collect();
        assert_eq!(ids, ChartId::ALL.to_vec());
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let dash = Dashboard::new(fixtures::datasets());
        let stale = dash.begin();
        let fresh = dash.begin();

        let sel = FilterSelection::all();
        let params = ChartParams::default();
        assert_eq!(
            dash.refresh_with(stale, &sel, &params).unwrap(),
            Refresh::Superseded
        );
        assert!(matches!(
            dash.refresh_with(fresh, &sel, &params).unwrap(),
            Refresh::Panels(_)
        ));
    }

    #[test]
    fn panels_serialize_with_type_tag() {
        let dash = Dashboard::new(fixtures::datasets());
        let panel = dash
            .render(
                ChartId::DeathsCounter,
                &FilterSelection::new("Oceania", "All"),
                &ChartParams::default(),
            )
            .unwrap();
        let json = serde_json::to_value(&panel).unwrap();
        assert_eq!(json["type"], "counter");
        assert_eq!(json["chart"], "deaths_counter");
        assert_eq!(json["value"], "not specified");
        assert_eq!(json["coverage"], "observed");
    }
}
