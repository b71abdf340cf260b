//! Connectivity checks across every provider the pipeline depends on.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::describe_error;
use crate::adapters::Providers;
use crate::store::DocumentStore;

/// Result of one provider probe
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCheck {
    pub provider: String,
    pub ok: bool,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub checks: Vec<ProviderCheck>,
}

impl ProviderReport {
    pub fn all_ok(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }
}

async fn probe<F>(provider: &str, check: F) -> ProviderCheck
where
    F: std::future::Future<Output = Result<()>>,
{
    let started = Instant::now();
    let result = check.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            info!(provider, elapsed_ms, "Provider reachable");
            ProviderCheck {
                provider: provider.to_string(),
                ok: true,
                elapsed_ms,
                error: None,
            }
        }
        Err(e) => {
            let error = describe_error(&e);
            warn!(provider, elapsed_ms, %error, "Provider check failed");
            ProviderCheck {
                provider: provider.to_string(),
                ok: false,
                elapsed_ms,
                error: Some(error),
            }
        }
    }
}

/// Probe the generative model, speech, image host and store concurrently
pub async fn check_providers(providers: &Providers, store: Arc<dyn DocumentStore>) -> ProviderReport {
    let (model, speech, image_host, database) = tokio::join!(
        probe(providers.text.name(), providers.text.health_check()),
        probe(providers.speech.name(), providers.speech.health_check()),
        probe(providers.image_host.name(), providers.image_host.health_check()),
        probe("database", async {
            let count = store.count_entries().await?;
            info!(count, "Document store reachable");
            Ok::<(), anyhow::Error>(())
        }),
    );

    ProviderReport {
        checks: vec![model, speech, image_host, database],
    }
}
