use anyhow::Result;

use std::future::Future;

#[cfg(feature = "timestream-aws")]
mod aws;
#[cfg(feature = "timestream-aws")]
pub use aws::TimestreamAws as TimestreamService;

#[cfg(feature = "timestream-stub")]
mod stub;
#[cfg(feature = "timestream-stub")]
pub use stub::TimestreamStub as TimestreamService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
}

/// One positional value of a result row. `None` when the service sent no
/// scalar for that column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Datum {
    pub scalar_value: Option<String>,
}

impl Datum {
    pub fn scalar(value: impl Into<String>) -> Datum {
        Datum {
            scalar_value: Some(value.into()),
        }
    }

    pub fn absent() -> Datum {
        Datum { scalar_value: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub data: Vec<Datum>,
}

/// The two calls the dashboard makes against the time-series query service.
pub trait QueryService: Sized {
    fn describe_endpoints(&self) -> impl Future<Output = Result<Vec<Endpoint>>> + Send;

    /// Returns a handle whose queries go to `address`. `self` is not modified.
    fn bind(&self, address: &str) -> Self;

    fn query(&self, query_string: &str) -> impl Future<Output = Result<Vec<Row>>> + Send;
}
