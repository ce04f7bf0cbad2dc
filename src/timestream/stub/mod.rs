use anyhow::Result;
use chrono::{Duration, NaiveDate};

use super::{Datum, Endpoint, QueryService, Row};

/// Serves a fixed set of readings so the dashboard runs without AWS.
#[derive(Debug, Clone)]
pub struct TimestreamStub {
    address: Option<String>,
}

impl TimestreamStub {
    const ENDPOINT: &'static str = "query-stub.timestream.local";
    const ROW_COUNT: i64 = 10;

    pub async fn new() -> Result<TimestreamStub> {
        Ok(TimestreamStub { address: None })
    }
}

impl QueryService for TimestreamStub {
    async fn describe_endpoints(&self) -> Result<Vec<Endpoint>> {
        Ok(vec![Endpoint {
            address: Self::ENDPOINT.to_owned(),
        }])
    }

    fn bind(&self, address: &str) -> TimestreamStub {
        TimestreamStub {
            address: Some(address.to_owned()),
        }
    }

    async fn query(&self, query_string: &str) -> Result<Vec<Row>> {
        log::trace!("Stub query against {:?}: {query_string}", self.address);

        let latest = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_milli_opt(10, 0, 0, 250))
            .ok_or_else(|| anyhow::anyhow!("invalid stub timestamp"))?;

        Ok((0..Self::ROW_COUNT)
            .map(|i| {
                let time = latest - Duration::minutes(i);
                let step = i as f64;

                Row {
                    data: vec![
                        Datum::scalar("sensor-1"),
                        Datum::scalar("Environment"),
                        Datum::scalar(time.format("%Y-%m-%d %H:%M:%S%.9f").to_string()),
                        Datum::scalar(format!("{}", 21.4567 - step * 0.1)),
                        // Every third reading is missing humidity.
                        if i % 3 == 2 {
                            Datum::absent()
                        } else {
                            Datum::scalar(format!("{}", 45.12 + step * 0.5))
                        },
                        Datum::scalar(format!("{}", 12.0 + step)),
                    ],
                }
            })
            .collect())
    }
}
