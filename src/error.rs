use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Missing column '{column}' in {table} table")]
    Schema { table: &'static str, column: String },

    #[error("Unparseable {column} '{value}' at row {row} of {table} table")]
    Parse {
        table: &'static str,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<toml::de::Error> for DashError {
    fn from(err: toml::de::Error) -> Self {
        DashError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
