use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;

use std::{net::SocketAddr, time::Duration};

mod readings;

mod timestream;
use timestream::TimestreamService;

mod web;
use web::AppState;

#[derive(Debug, PartialEq)]
struct GlobalConfig {
    bind_addr: SocketAddr,
    query_timeout: Duration,
}

impl GlobalConfig {
    const BIND_ADDR_ENV_VAR: &'static str = "DASHBOARD_BIND_ADDR";
    const QUERY_TIMEOUT_ENV_VAR: &'static str = "QUERY_TIMEOUT_SECS";

    const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:80";
    const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr: SocketAddr = match lookup(Self::BIND_ADDR_ENV_VAR) {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("{} is not a socket address: {addr}", Self::BIND_ADDR_ENV_VAR))?,
            None => Self::DEFAULT_BIND_ADDR.parse()?,
        };

        let query_timeout_secs: u64 = match lookup(Self::QUERY_TIMEOUT_ENV_VAR) {
            Some(secs) => secs
                .parse()
                .with_context(|| format!("{} is not a number: {secs}", Self::QUERY_TIMEOUT_ENV_VAR))?,
            None => Self::DEFAULT_QUERY_TIMEOUT_SECS,
        };
        if query_timeout_secs == 0 {
            bail!("{} must be at least 1", Self::QUERY_TIMEOUT_ENV_VAR);
        }

        Ok(Self {
            bind_addr,
            query_timeout: Duration::from_secs(query_timeout_secs),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, the process environment is used as is.
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = GlobalConfig::from_env()?;
    log::info!("Starting with {config:?}");

    let service = TimestreamService::new().await?;
    let app = web::router(AppState {
        service,
        query_timeout: config.query_timeout,
    });

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<GlobalConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GlobalConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_port_80() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:80".parse().unwrap());
        assert_eq!(config.query_timeout, Duration::from_secs(10));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("DASHBOARD_BIND_ADDR", "127.0.0.1:8080"),
            ("QUERY_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        assert_eq!(
            config,
            GlobalConfig {
                bind_addr: "127.0.0.1:8080".parse().unwrap(),
                query_timeout: Duration::from_secs(3),
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("DASHBOARD_BIND_ADDR", "port eighty")]).is_err());
        assert!(config_from(&[("QUERY_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config_from(&[("QUERY_TIMEOUT_SECS", "0")]).is_err());
    }
}
