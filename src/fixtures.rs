//! Small hand-checked tables shared by the unit tests.

use polars::prelude::*;

use crate::dataset::Datasets;
use crate::schema::{location, metrics, testing};

pub fn raw_metrics() -> DataFrame {
    df!(
        location::CONTINENT => ["Europe", "Europe", "Europe", "Europe", "Europe", "Asia", "Asia", "Oceania"],
        location::COUNTRY => ["France", "France", "France", "Germany", "Germany", "Japan", "Japan", "Nauru"],
        location::DATE => ["2021-01-01", "2021-01-02", "2021-01-03", "2021-01-01", "2021-01-02", "2021-01-01", "2022-01-01", "2022-01-01"],
        metrics::NEW_CASES => ["100", "0", "50", "200", "300", "10", "20", "0"],
        metrics::NEW_DEATHS => ["1", "0", "2", "5", "5", "0", "0", "0"],
        metrics::TOTAL_CASES => ["100", "100", "150", "200", "500", "10", "30", "0"],
        metrics::TOTAL_DEATHS => ["1", "1", "3", "5", "10", "0", "0", "0"],
        metrics::REPRODUCTION_RATE => [Some("1.1"), None, Some("0.9"), Some("1.0"), Some("1.2"), Some("0.8"), None, None],
        metrics::MEDIAN_AGE => ["42", "42", "42", "46", "46", "48", "48", "26"],
        metrics::POPULATION => ["1000", "1000", "1000", "2000", "2000", "4000", "4000", "0"]
    )
    .unwrap()
}

pub fn raw_testing() -> DataFrame {
    df!(
        location::CONTINENT => ["Europe", "Europe", "Europe", "Europe", "Europe", "Asia", "Oceania"],
        location::COUNTRY => ["France", "France", "Germany", "Germany", "Germany", "Japan", "Nauru"],
        location::DATE => ["2021-01-01", "2021-01-03", "2021-01-02", "2021-01-02", "2021-01-01", "2021-01-01", "2021-01-01"],
        testing::NEW_TESTS => [Some("100"), Some("200"), Some("50"), Some("60"), Some("40"), Some("30"), None],
        testing::POSITIVE_RATE => [Some("0.1"), None, Some("0.2"), Some("0.2"), Some("0.1"), Some("0.1"), None],
        testing::HOSP_PATIENTS => [Some("10"), Some("12"), Some("20"), Some("21"), Some("15"), None, None],
        testing::ICU_PATIENTS => [Some("2"), Some("3"), Some("4"), Some("5"), Some("3"), None, None],
        testing::PEOPLE_VACCINATED => [Some("100"), Some("300"), Some("500"), Some("600"), Some("400"), None, Some("0")],
        testing::POPULATION => ["1000", "1000", "2000", "2000", "2000", "4000", "0"]
    )
    .unwrap()
}

pub fn datasets() -> Datasets {
    Datasets::from_frames(raw_metrics(), raw_testing(), "%Y-%m-%d").unwrap()
}
