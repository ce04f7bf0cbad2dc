use anyhow::Result;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_timestreamquery as timestream_query;

use super::{Datum, Endpoint, QueryService, Row};

/// Timestream query client. Cloning is cheap, the SDK client is reference counted.
#[derive(Debug, Clone)]
pub struct TimestreamAws {
    sdk_config: SdkConfig,
    client: timestream_query::Client,
}

impl TimestreamAws {
    pub async fn new() -> Result<TimestreamAws> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        log::debug!("Loaded AWS config for region {:?}", sdk_config.region());

        let client = timestream_query::Client::new(&sdk_config);

        Ok(TimestreamAws { sdk_config, client })
    }
}

/// A datum flagged as null carries no scalar, whatever the service sent alongside.
fn to_datum(datum: &timestream_query::types::Datum) -> Datum {
    match datum.null_value() {
        Some(true) => Datum::absent(),
        _ => Datum {
            scalar_value: datum.scalar_value().map(str::to_owned),
        },
    }
}

impl QueryService for TimestreamAws {
    async fn describe_endpoints(&self) -> Result<Vec<Endpoint>> {
        let response = self
            .client
            .describe_endpoints()
            .send()
            .await
            .map_err(timestream_query::Error::from)?;

        Ok(response
            .endpoints()
            .iter()
            .map(|endpoint| Endpoint {
                address: endpoint.address().to_owned(),
            })
            .collect())
    }

    fn bind(&self, address: &str) -> TimestreamAws {
        let config = timestream_query::config::Builder::from(&self.sdk_config)
            .endpoint_url(format!("https://{address}"))
            .build();

        TimestreamAws {
            sdk_config: self.sdk_config.clone(),
            client: timestream_query::Client::from_conf(config),
        }
    }

    async fn query(&self, query_string: &str) -> Result<Vec<Row>> {
        let response = self
            .client
            .query()
            .query_string(query_string)
            .send()
            .await
            .map_err(timestream_query::Error::from)?;

        log::debug!(
            "Query {:?} returned {} rows",
            response.query_id(),
            response.rows().len()
        );

        Ok(response
            .rows()
            .iter()
            .map(|row| Row {
                data: row
                    .data()
                    .iter()
                    .map(to_datum)
                    .collect(),
            })
            .collect())
    }
}
