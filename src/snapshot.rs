use polars::prelude::*;

use crate::error::Result;
use crate::schema::{derived, location, testing};

/// Latest known vaccination/population record per country.
///
/// Keeps, for every country of the testing table, the row with the maximum
/// date. Rows without a country are left out. Rows sharing that maximum date are resolved in favour of the one
/// appearing first in the table. Output is sorted by country and projected
/// to continent, country, date, people_vaccinated and population.
pub fn latest_snapshot(testing_df: &DataFrame) -> Result<DataFrame> {
    let df = testing_df
        .clone()
        .lazy()
        .with_row_index(derived::ROW_INDEX, None)
        .filter(col(location::COUNTRY).is_not_null())
        .sort(
            [location::COUNTRY, location::DATE, derived::ROW_INDEX],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true, false])
                .with_maintain_order(true),
        )
        .group_by_stable([col(location::COUNTRY)])
        .agg([
            col(location::CONTINENT).first(),
            col(location::DATE).first(),
            col(testing::PEOPLE_VACCINATED).first(),
            col(testing::POPULATION).first(),
        ])
        .select([
            col(location::CONTINENT),
            col(location::COUNTRY),
            col(location::DATE),
            col(testing::PEOPLE_VACCINATED),
            col(testing::POPULATION),
        ])
        .collect()?;

    tracing::debug!(countries = df.height(), "Built latest snapshot");
    Ok(df)
}
