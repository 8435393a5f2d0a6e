//! Python surface for the Dash shell.
//!
//! Payloads cross the boundary as JSON strings; tables as polars DataFrames.
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::charts::Measure;
use crate::config::DashboardConfig;
use crate::dispatch::{ChartId, ChartParams, Dashboard, Refresh};
use crate::error::DashError;
use crate::filter::{Choice, FilterSelection};
use crate::schema;

impl From<DashError> for PyErr {
    fn from(err: DashError) -> PyErr {
        match err {
            DashError::UnknownChart(_) | DashError::InvalidParameter(_) => {
                PyValueError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    inner: Dashboard,
}

#[pymethods]
impl PyDashboard {
    /// Load both data files from `base_path`.
    #[new]
    #[pyo3(signature = (base_path, metrics_file=None, testing_file=None, date_format=None))]
    fn new(
        base_path: String,
        metrics_file: Option<String>,
        testing_file: Option<String>,
        date_format: Option<String>,
    ) -> PyResult<Self> {
        let mut config = DashboardConfig::with_base_path(base_path);
        if let Some(f) = metrics_file {
            config.metrics_file = f;
        }
        if let Some(f) = testing_file {
            config.testing_file = f;
        }
        if let Some(f) = date_format {
            config.date_format = f;
        }
        Ok(Self {
            inner: Dashboard::load(&config)?,
        })
    }

    /// Load using a TOML config file.
    #[staticmethod]
    fn from_config(path: String) -> PyResult<Self> {
        let config = DashboardConfig::from_toml_file(std::path::Path::new(&path))?;
        Ok(Self {
            inner: Dashboard::load(&config)?,
        })
    }

    /// Render one panel as JSON.
    ///
    /// Args:
    ///     chart: one of `Dashboard.chart_ids()`
    ///     continent, country: selector values, "All" for no filter
    ///     measure: "cases" or "deaths", for the charts that have the toggle
    #[pyo3(signature = (chart, continent="All", country="All", measure="cases"))]
    fn render(
        &self,
        py: Python<'_>,
        chart: &str,
        continent: &str,
        country: &str,
        measure: &str,
    ) -> PyResult<String> {
        let chart = ChartId::parse(chart)?;
        let selection = FilterSelection::new(continent, country);
        let params = ChartParams::uniform(Measure::parse(measure)?);

        let panel = py.allow_threads(|| self.inner.render(chart, &selection, &params))?;
        Ok(serde_json::to_string(&panel).map_err(DashError::from)?)
    }

    /// Render every panel as a JSON list, or `None` when a newer call
    /// overtook this one.
    #[pyo3(signature = (
        continent="All",
        country="All",
        bar_measure="cases",
        evolution_measure="cases",
        map_measure="cases",
    ))]
    fn refresh(
        &self,
        py: Python<'_>,
        continent: &str,
        country: &str,
        bar_measure: &str,
        evolution_measure: &str,
        map_measure: &str,
    ) -> PyResult<Option<String>> {
        let selection = FilterSelection::new(continent, country);
        let params = ChartParams {
            bar_measure: Measure::parse(bar_measure)?,
            evolution_measure: Measure::parse(evolution_measure)?,
            map_measure: Measure::parse(map_measure)?,
        };

        let ticket = self.inner.begin();
        let refresh =
            py.allow_threads(|| self.inner.refresh_with(ticket, &selection, &params))?;
        match refresh {
            Refresh::Panels(panels) => Ok(Some(
                serde_json::to_string(&panels).map_err(DashError::from)?,
            )),
            Refresh::Superseded => Ok(None),
        }
    }

    fn continent_options(&self) -> PyResult<Vec<String>> {
        Ok(self.inner.continent_options()?)
    }

    #[pyo3(signature = (continent="All"))]
    fn country_options(&self, continent: &str) -> PyResult<Vec<String>> {
        Ok(self.inner.country_options(&Choice::parse(continent))?)
    }

    #[staticmethod]
    fn chart_ids() -> Vec<&'static str> {
        ChartId::ALL.iter().map(|id| id.as_str()).collect()
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn metrics_df(&self) -> PyDataFrame {
        PyDataFrame(self.inner.data().metrics().clone())
    }

    #[getter]
    fn testing_df(&self) -> PyDataFrame {
        PyDataFrame(self.inner.data().testing().clone())
    }

    #[getter]
    fn snapshot_df(&self) -> PyDataFrame {
        PyDataFrame(self.inner.data().snapshot().clone())
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Location
    let location = PyModule::new(m.py(), "location")?;
    location.add("CONTINENT", schema::location::CONTINENT)?;
    location.add("COUNTRY", schema::location::COUNTRY)?;
    location.add("DATE", schema::location::DATE)?;
    m.add_submodule(&location)?;

    // Metrics
    let metrics = PyModule::new(m.py(), "metrics")?;
    metrics.add("NEW_CASES", schema::metrics::NEW_CASES)?;
    metrics.add("NEW_DEATHS", schema::metrics::NEW_DEATHS)?;
    metrics.add("TOTAL_CASES", schema::metrics::TOTAL_CASES)?;
    metrics.add("TOTAL_DEATHS", schema::metrics::TOTAL_DEATHS)?;
    metrics.add("REPRODUCTION_RATE", schema::metrics::REPRODUCTION_RATE)?;
    metrics.add("MEDIAN_AGE", schema::metrics::MEDIAN_AGE)?;
    metrics.add("POPULATION", schema::metrics::POPULATION)?;
    m.add_submodule(&metrics)?;

    // Testing
    let testing = PyModule::new(m.py(), "testing")?;
    testing.add("NEW_TESTS", schema::testing::NEW_TESTS)?;
    testing.add("POSITIVE_RATE", schema::testing::POSITIVE_RATE)?;
    testing.add("POSITIVE_TESTS", schema::testing::POSITIVE_TESTS)?;
    testing.add("HOSP_PATIENTS", schema::testing::HOSP_PATIENTS)?;
    testing.add("ICU_PATIENTS", schema::testing::ICU_PATIENTS)?;
    testing.add("PEOPLE_VACCINATED", schema::testing::PEOPLE_VACCINATED)?;
    testing.add("POPULATION", schema::testing::POPULATION)?;
    m.add_submodule(&testing)?;

    // Measure
    let measure = PyModule::new(m.py(), "measure")?;
    measure.add("CASES", schema::measure::CASES)?;
    measure.add("DEATHS", schema::measure::DEATHS)?;
    m.add_submodule(&measure)?;

    Ok(())
}

#[pymodule]
fn covid_dash(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDashboard>()?;
    m.add("ALL", schema::selection::ALL)?;
    add_schema_exports(m)?;
    Ok(())
}
