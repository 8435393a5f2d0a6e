//! End-to-end tests: CSV files on disk through to chart payloads.

use std::fs;

use covid_dash::{
    aggregate, filter, headline_counters, AxisValue, ChartId, ChartParams, Counter, Dashboard,
    DashError, DashboardConfig, Datasets, FilterSelection, GroupDimensions, Measure, Panel,
    ReduceSpec,
};
use tempfile::TempDir;

const METRICS_CSV: &str = "\
continent,country,date,new_cases,new_deaths,total_cases,total_deaths,reproduction_rate,median_age,population
Europe,France,2021-03-01,100,1,100,1,1.1,42.1,67000000
Europe,France,2021-03-02,0,0,100,1,,42.1,67000000
Europe,France,2021-03-03,50,2,150,3,0.9,42.1,67000000
Europe,Italy,2021-03-01,400,10,400,10,1.3,47.9,60000000
Europe,Italy,2021-03-02,600,20,1000,30,1.2,47.9,60000000
Asia,Japan,2021-03-01,30,1,30,1,0.8,48.2,125000000
Asia,Japan,2022-01-15,70,0,100,1,,48.2,125000000
Africa,Chad,2021-03-01,0,0,0,0,,16.7,
";

const TESTING_CSV: &str = "\
continent,country,date,new_tests,positive_rate,hosp_patients,icu_patients,people_vaccinated,population
Europe,France,2021-03-01,1000,0.05,300,40,1000,67000000
Europe,France,2021-03-03,2000,0.04,310,42,5000,67000000
Europe,Italy,2021-03-02,1500,0.1,500,60,8000,60000000
Asia,Japan,2021-03-01,800,0.02,,,2000,125000000
Africa,Chad,2021-03-01,,,,,,
";

fn write_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("covid_main_database.csv"), METRICS_CSV).unwrap();
    fs::write(dir.path().join("covid_second_database.csv"), TESTING_CSV).unwrap();
    dir
}

fn load() -> (TempDir, Dashboard) {
    let dir = write_fixture();
    let dash = Dashboard::load(&DashboardConfig::with_base_path(dir.path())).unwrap();
    (dir, dash)
}

fn chart(dash: &Dashboard, id: ChartId, sel: &FilterSelection) -> covid_dash::ChartPayload {
    match dash.render(id, sel, &ChartParams::default()).unwrap() {
        Panel::Chart(payload) => payload,
        other => panic!("expected chart for {id}, got {other:?}"),
    }
}

fn labels(xs: &[AxisValue]) -> Vec<String> {
    xs.iter()
        .map(|x| match x {
            AxisValue::Label(l) => l.clone(),
            AxisValue::Date(d) => d.to_string(),
            AxisValue::Year(y) => y.to_string(),
            AxisValue::Number(n) => n.to_string(),
        })
        .collect()
}

#[test]
fn europe_selection_groups_by_country() {
    let (_dir, dash) = load();
    let europe = FilterSelection::new("Europe", "All");

    let bar = chart(&dash, ChartId::CasesDeathsBar, &europe);
    assert_eq!(labels(&bar.traces[0].x), vec!["France", "Italy"]);
    assert_eq!(bar.traces[0].y, vec![Some(150.0), Some(1000.0)]);

    let age = chart(&dash, ChartId::MedianAgeBar, &europe);
    assert_eq!(labels(&age.traces[0].x), vec!["France", "Italy"]);

    let counters = headline_counters(dash.data(), &europe).unwrap();
    assert_eq!(counters.cases.value, Counter::Total(1150.0));
    assert_eq!(counters.deaths.value, Counter::Total(33.0));
    // Latest snapshot: France 5000 + Italy 8000
    assert_eq!(counters.vaccinated.value, Counter::Total(13000.0));
}

#[test]
fn single_country_evolution_is_by_date() {
    let (_dir, dash) = load();
    let line = chart(&dash, ChartId::EvolutionLine, &FilterSelection::new("All", "France"));

    assert_eq!(
        labels(&line.traces[0].x),
        vec!["2021-03-01", "2021-03-02", "2021-03-03"]
    );
    assert_eq!(line.traces[0].y, vec![Some(100.0), Some(100.0), Some(150.0)]);
}

#[test]
fn choropleth_ignores_selection() {
    let (_dir, dash) = load();
    let world = chart(&dash, ChartId::Choropleth, &FilterSelection::all());
    let france = chart(&dash, ChartId::Choropleth, &FilterSelection::new("Europe", "France"));
    assert_eq!(world, france);

    // Chad has no population and is left out
    assert_eq!(labels(&world.traces[0].x), vec!["France", "Italy", "Japan"]);
}

#[test]
fn counters_report_not_specified_for_zero() {
    let (_dir, dash) = load();
    let chad = headline_counters(dash.data(), &FilterSelection::new("Africa", "All")).unwrap();
    assert_eq!(chad.cases.value, Counter::NotSpecified);
    assert_eq!(chad.vaccinated.value, Counter::NotSpecified);
    assert_eq!(chad.cases.value.to_string(), "not specified");
}

#[test]
fn empty_selection_renders_empty_charts() {
    let (_dir, dash) = load();
    let nowhere = FilterSelection::new("Europe", "Japan");
    for id in ChartId::ALL {
        dash.render(id, &nowhere, &ChartParams::uniform(Measure::Deaths))
            .unwrap_or_else(|e| panic!("{id} failed on empty selection: {e}"));
    }
    let bar = chart(&dash, ChartId::CasesDeathsBar, &nowhere);
    assert!(bar.traces[0].is_empty());
}

#[test]
fn no_payload_carries_non_finite_values() {
    let (_dir, dash) = load();
    let json = serde_json::to_string(
        &dash
            .refresh(&FilterSelection::all(), &ChartParams::default())
            .unwrap(),
    )
    .unwrap();
    assert!(!json.contains("NaN"));
    assert!(!json.contains("inf"));
}

#[test]
fn snapshot_uses_latest_row_per_country() {
    let (_dir, dash) = load();
    let snap = dash.data().snapshot();
    assert_eq!(snap.height(), 4);

    let series = aggregate(
        snap,
        GroupDimensions::Country,
        &ReduceSpec::new().sum("people_vaccinated"),
    )
    .unwrap();
    assert_eq!(
        series.value_at(&covid_dash::GroupKey::Label("France".into()), "people_vaccinated"),
        Some(5000.0)
    );
}

#[test]
fn country_options_follow_continent() {
    let (_dir, dash) = load();
    assert_eq!(
        dash.country_options(&"Europe".into()).unwrap(),
        vec!["France", "Italy"]
    );
    assert_eq!(dash.country_options(&"All".into()).unwrap().len(), 4);
}

#[test]
fn missing_column_fails_load() {
    let dir = write_fixture();
    fs::write(
        dir.path().join("covid_second_database.csv"),
        "continent,country,date\nEurope,France,2021-03-01\n",
    )
    .unwrap();
    let err = Datasets::load(&DashboardConfig::with_base_path(dir.path())).unwrap_err();
    assert!(matches!(err, DashError::Schema { table: "testing", .. }));
}

#[test]
fn bad_date_fails_load() {
    let dir = write_fixture();
    fs::write(
        dir.path().join("covid_main_database.csv"),
        METRICS_CSV.replace("2021-03-02", "2021-13-02"),
    )
    .unwrap();
    let err = Datasets::load(&DashboardConfig::with_base_path(dir.path())).unwrap_err();
    assert!(matches!(err, DashError::Parse { table: "metrics", .. }));
}

#[test]
fn filtered_table_feeds_aggregation_directly() {
    let (_dir, dash) = load();
    let asia = filter(dash.data().metrics(), &FilterSelection::new("Asia", "All")).unwrap();
    let yearly = aggregate(&asia, GroupDimensions::Year, &ReduceSpec::new().sum("new_cases")).unwrap();
    assert_eq!(yearly.len(), 2);
}

#[test]
fn scatter_renders_from_loaded_csv() {
    let (_dir, dash) = load();
    for sel in [
        FilterSelection::all(),
        FilterSelection::new("Europe", "All"),
        FilterSelection::new("All", "France"),
    ] {
        let scatter = chart(&dash, ChartId::ReproductionScatter, &sel);
        assert!(!scatter.traces[0].is_empty(), "{sel}");
    }

    let france = chart(&dash, ChartId::ReproductionScatter, &FilterSelection::new("All", "France"));
    // 2021-03-02 has no reproduction rate
    assert_eq!(labels(&france.traces[0].x), vec!["2021-03-01", "2021-03-03"]);
    assert_eq!(france.traces[0].y, vec![Some(1.1), Some(0.9)]);
}

#[test]
fn spreadsheet_style_dates_load() {
    let dir = write_fixture();
    fs::write(
        dir.path().join("covid_second_database.csv"),
        TESTING_CSV.replace(",2021-03-01,", ",2021-03-01 00:00:00,"),
    )
    .unwrap();
    let data = Datasets::load(&DashboardConfig::with_base_path(dir.path())).unwrap();
    assert_eq!(data.snapshot().height(), 4);
}
