/// Column-name constants for the covid-dash tables.
/// Single source of truth - exported to Python via PyO3.

// ── Shared location/time columns ────────────────────────────────────────────
pub mod location {
    pub const CONTINENT: &str = "continent";
    pub const COUNTRY: &str = "country";
    pub const DATE: &str = "date";
}

// ── Primary (daily metrics) table ───────────────────────────────────────────
pub mod metrics {
    pub const NEW_CASES: &str = "new_cases";
    pub const NEW_DEATHS: &str = "new_deaths";
    pub const TOTAL_CASES: &str = "total_cases";
    pub const TOTAL_DEATHS: &str = "total_deaths";
    pub const REPRODUCTION_RATE: &str = "reproduction_rate";
    pub const MEDIAN_AGE: &str = "median_age";
    pub const POPULATION: &str = "population";

    pub const NUMERIC: [&str; 7] = [
        NEW_CASES,
        NEW_DEATHS,
        TOTAL_CASES,
        TOTAL_DEATHS,
        REPRODUCTION_RATE,
        MEDIAN_AGE,
        POPULATION,
    ];
}

// ── Secondary (testing/vaccination) table ───────────────────────────────────
pub mod testing {
    pub const NEW_TESTS: &str = "new_tests";
    pub const POSITIVE_RATE: &str = "positive_rate";
    pub const HOSP_PATIENTS: &str = "hosp_patients";
    pub const ICU_PATIENTS: &str = "icu_patients";
    pub const PEOPLE_VACCINATED: &str = "people_vaccinated";
    pub const POPULATION: &str = "population";

    /// Derived at load: new_tests * positive_rate.
    pub const POSITIVE_TESTS: &str = "positive_tests";

    pub const NUMERIC: [&str; 6] = [
        NEW_TESTS,
        POSITIVE_RATE,
        HOSP_PATIENTS,
        ICU_PATIENTS,
        PEOPLE_VACCINATED,
        POPULATION,
    ];
}

// ── Computed views (never stored on the loaded tables) ──────────────────────
pub mod derived {
    pub const YEAR: &str = "year";
    pub const ROW_INDEX: &str = "__row";
}

// ── Selection sentinel ──────────────────────────────────────────────────────
pub mod selection {
    pub const ALL: &str = "All";
}

// ── Measure toggle values ───────────────────────────────────────────────────
pub mod measure {
    pub const CASES: &str = "cases";
    pub const DEATHS: &str = "deaths";
}
