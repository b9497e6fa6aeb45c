use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::InputConfig;
use crate::error::{ChoroplethError, Result};
use crate::topology::Topology;
use crate::types::RawCountyStat;

/// Both datasets, parsed but not yet validated.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub education: Vec<RawCountyStat>,
    pub topology: Topology,
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub fn build_client(input: &InputConfig) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = input.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| ChoroplethError::Fetch {
        source_name: "http client".to_string(),
        reason: e.to_string(),
    })
}

/// Fetches `location` (URL or local path) and parses it as JSON.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, location: &str) -> Result<T> {
    let body = if is_remote(location) {
        let response = client
            .get(location)
            .send()
            .await
            .map_err(|e| ChoroplethError::Fetch {
                source_name: location.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChoroplethError::HttpStatus {
                source_name: location.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|e| ChoroplethError::Fetch {
            source_name: location.to_string(),
            reason: e.to_string(),
        })?;
        bytes.to_vec()
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read(Path::new(path))
            .await
            .map_err(|e| ChoroplethError::Fetch {
                source_name: location.to_string(),
                reason: e.to_string(),
            })?
    };

    serde_json::from_slice(&body).map_err(|e| ChoroplethError::Parse {
        source_name: location.to_string(),
        reason: e.to_string(),
    })
}

/// Fetches the statistics and the topology concurrently; fails if either does.
pub async fn load_datasets(input: &InputConfig) -> Result<Datasets> {
    info!(education = %input.education, counties = %input.counties, "loading datasets");
    let client = build_client(input)?;

    let (education, topology) = tokio::try_join!(
        fetch_json::<Vec<RawCountyStat>>(&client, &input.education),
        fetch_json::<Topology>(&client, &input.counties),
    )?;

    info!(
        rows = education.len(),
        arcs = topology.arcs.len(),
        "loaded statistics and topology"
    );
    Ok(Datasets {
        education,
        topology,
    })
}
