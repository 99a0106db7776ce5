use async_trait::async_trait;
use gloo_net::http::Request;
use serde::{Deserialize, Serialize};

use chat_core::ports::TitleGeneratorPort;
use chat_types::{config::BackendConfig, Result};

use super::{check_status, transport_error};

#[derive(Serialize)]
struct TitleRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct TitleResponse {
    #[serde(default)]
    title: String,
}

/// Remote title synthesis. The caller applies the timeout.
pub struct HttpTitleGenerator {
    config: BackendConfig,
}

impl HttpTitleGenerator {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl TitleGeneratorPort for HttpTitleGenerator {
    async fn generate_title(&self, first_message: &str) -> Result<String> {
        let response = Request::post(&self.config.title_url())
            .json(&TitleRequest { message: first_message })
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;
        let data: TitleResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(data.title)
    }
}
