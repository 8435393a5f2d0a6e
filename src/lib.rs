//! Filter-and-aggregate core of a COVID-19 dashboard.
//!
//! Two tables are loaded once ([`Datasets`]); every panel is then a pure
//! function of those tables and a continent/country [`FilterSelection`],
//! returning a renderer-agnostic payload. Python bindings live behind the
//! `python` feature.

pub mod aggregation;
pub mod charts;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod schema;
pub mod snapshot;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod fixtures;

pub use aggregation::{
    aggregate, headline_counter, headline_counters, AggregatedSeries, Counter, CounterReading,
    Coverage, Granularity, GroupDimensions, GroupKey, Headline, HeadlineCounters, Reduce,
    ReduceSpec,
};
pub use charts::{AxisValue, ChartPayload, Measure, Trace, TraceKind};
pub use config::DashboardConfig;
pub use dataset::Datasets;
pub use dispatch::{ChartId, ChartParams, Dashboard, Panel, Refresh};
pub use error::{DashError, Result};
pub use filter::{filter, Choice, FilterSelection};
