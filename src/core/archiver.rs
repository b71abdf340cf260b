//! Archive step: upload the raw capture to durable storage.

use std::sync::Arc;

use tracing::{info, instrument};

use super::{describe_error, PipelineError};
use crate::adapters::ImageHost;
use crate::domain::Capture;

pub struct ImageArchiver {
    host: Arc<dyn ImageHost>,
}

impl ImageArchiver {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }

    /// Upload the capture and return its stable URL
    #[instrument(skip_all, fields(host = self.host.name()))]
    pub async fn archive(&self, capture: &Capture) -> Result<String, PipelineError> {
        let url = self
            .host
            .upload(&capture.image)
            .await
            .map_err(|e| PipelineError::Archive(describe_error(&e)))?;

        info!(%url, "Image archived");
        Ok(url)
    }
}
