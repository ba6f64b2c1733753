//! Bill record store backed by the rentbook JSON API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use rentbook_core::{
    BillWithDetails, BillWrite, PeriodKey, RenterId, RentbookResult, SaveBillResult, StoreError,
};
use rentbook_storage::BillRecordStore;
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, ClientConfig};

#[derive(Debug, thiserror::Error)]
pub enum HttpStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Error body the API returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PeriodQuery {
    renter_id: RenterId,
    month: u32,
    year: i32,
}

impl From<PeriodKey> for PeriodQuery {
    fn from(key: PeriodKey) -> Self {
        Self {
            renter_id: key.entity_id(),
            month: key.month(),
            year: key.year(),
        }
    }
}

#[derive(Clone)]
pub struct HttpBillStore {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
}

impl std::fmt::Debug for HttpBillStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBillStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBillStore {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpStoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let auth_headers = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_bill(&self, key: PeriodKey) -> Result<BillWithDetails, HttpStoreError> {
        self.get_json("/api/bills", Some(&PeriodQuery::from(key)))
            .await
    }

    pub async fn list_bills(
        &self,
        renter_id: RenterId,
    ) -> Result<Vec<BillWithDetails>, HttpStoreError> {
        let path = format!("/api/renters/{}/bills", renter_id);
        self.get_json::<Vec<BillWithDetails>, ()>(&path, None).await
    }

    pub async fn save_bill(&self, write: &BillWrite) -> Result<SaveBillResult, HttpStoreError> {
        let result: SaveBillResult = self.post_json("/api/bills", write).await?;
        if !result.success {
            return Err(HttpStoreError::InvalidResponse(
                "save reported success = false".to_string(),
            ));
        }
        Ok(result)
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, HttpStoreError>
    where
        T: serde::de::DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(url).headers(self.auth_headers.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, HttpStoreError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers.clone())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, HttpStoreError> {
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(HttpStoreError::InvalidResponse(failure_message(
                status.as_u16(),
                &text,
            )))
        }
    }
}

/// Message for a failed response: the API's `error` field if the body has
/// one, else the status and raw body.
fn failure_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => format!("HTTP {}: {}", status, parsed.error),
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, HttpStoreError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| HttpStoreError::Config(e.to_string()))?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&value).map_err(|e| HttpStoreError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[async_trait]
impl BillRecordStore for HttpBillStore {
    async fn read_period(&self, key: PeriodKey) -> RentbookResult<BillWithDetails> {
        self.get_bill(key).await.map_err(|e| {
            StoreError::ReadFailed {
                key,
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn read_all_periods(&self, renter_id: RenterId) -> RentbookResult<Vec<BillWithDetails>> {
        self.list_bills(renter_id).await.map_err(|e| {
            StoreError::Unavailable {
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn write_period(&self, write: BillWrite) -> RentbookResult<SaveBillResult> {
        let key = write.period()?;
        self.save_bill(&write).await.map_err(|e| {
            StoreError::WriteRejected {
                key,
                reason: e.to_string(),
            }
            .into()
        })
    }
}
