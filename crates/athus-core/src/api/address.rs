//! CEP to address lookup through the public ViaCEP API.
//!
//! Third-party call: it goes through a plain `reqwest::Client`, never the
//! authenticated client, so no bearer token leaves for another host.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::models::Address;
use crate::utils::format::mask_cep;
use crate::validation::form::is_valid_cep;

/// Default ViaCEP endpoint
pub const VIACEP_BASE_URL: &str = "https://viacep.com.br/ws";

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Every address resolved through ViaCEP is in Brazil
const COUNTRY: &str = "Brasil";

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
    /// `true` (or `"true"`) when the CEP does not exist
    #[serde(default)]
    erro: Option<serde_json::Value>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s != "false",
            Some(_) => true,
        }
    }
}

#[derive(Clone)]
pub struct AddressClient {
    client: Client,
    base_url: String,
}

impl AddressClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(VIACEP_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a CEP (`00000-000` or `00000000`).
    ///
    /// Returns `Ok(None)` when ViaCEP reports the CEP does not exist.
    pub async fn lookup(&self, cep: &str) -> Result<Option<Address>, ApiError> {
        let cep = cep.trim();
        if !is_valid_cep(cep) {
            return Err(ApiError::InvalidRequest(format!(
                "Invalid CEP '{}', expected 00000-000",
                cep
            )));
        }

        let digits: String = cep.chars().filter(|c| c.is_ascii_digit()).collect();
        let url = format!("{}/{}/json/", self.base_url, digits);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &headers, &body));
        }

        let data: ViaCepResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse ViaCEP response: {}", e)))?;

        if data.is_not_found() {
            debug!(cep = %digits, "CEP not found");
            return Ok(None);
        }

        Ok(Some(Address {
            cep: mask_cep(&digits),
            rua: data.logradouro.unwrap_or_default(),
            cidade: data.localidade.unwrap_or_default(),
            estado: data.uf.unwrap_or_default(),
            pais: COUNTRY.to_string(),
        }))
    }
}
