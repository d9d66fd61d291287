//! Pinata HTTP client.

use super::{ContentId, PinError, PinResult, PinningService};
use crate::BoxFuture;
use crate::config::PinataConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Pins content through the Pinata REST API.
#[derive(Debug, Clone)]
pub struct PinataClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Build a client from config. Fails before any request when either key
    /// is missing.
    pub fn from_config(config: &PinataConfig) -> PinResult<Self> {
        match (&config.api_key, &config.secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok(Self::new(&config.api_base, key, secret))
            }
            _ => Err(PinError::MissingCredentials),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/pinning/{}", self.api_base, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> PinResult<ContentId> {
        let response = request
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
            .send()
            .await
            .map_err(|e| PinError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PinResponse = response
            .json()
            .await
            .map_err(|e| PinError::InvalidResponse(e.to_string()))?;
        if parsed.ipfs_hash.is_empty() {
            return Err(PinError::InvalidResponse("empty IpfsHash".to_string()));
        }
        Ok(ContentId::new(parsed.ipfs_hash))
    }
}

fn file_form(name: &str, bytes: Vec<u8>, mime_type: &str) -> PinResult<Form> {
    let part = Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str(mime_type)
        .map_err(|e| PinError::Http(e.to_string()))?;
    let metadata = serde_json::json!({ "name": name }).to_string();
    let options = serde_json::json!({ "cidVersion": 0 }).to_string();

    Ok(Form::new()
        .part("file", part)
        .text("pinataMetadata", metadata)
        .text("pinataOptions", options))
}

impl PinningService for PinataClient {
    fn pin_file<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        mime_type: &'a str,
    ) -> BoxFuture<'a, PinResult<ContentId>> {
        Box::pin(async move {
            let form = file_form(name, bytes, mime_type)?;
            log::info!("Uploading {} to Pinata", name);
            let request = self.http.post(self.endpoint("pinFileToIPFS")).multipart(form);
            let cid = self.send(request).await?;
            log::info!("Pinned {} as {}", name, cid);
            Ok(cid)
        })
    }

    fn pin_json<'a>(
        &'a self,
        name: &'a str,
        document: &'a serde_json::Value,
    ) -> BoxFuture<'a, PinResult<ContentId>> {
        Box::pin(async move {
            log::info!("Uploading {} to Pinata", name);
            let request = self.http.post(self.endpoint("pinJSONToIPFS")).json(document);
            let cid = self.send(request).await?;
            log::info!("Pinned {} as {}", name, cid);
            Ok(cid)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials() {
        let config = PinataConfig::default();
        assert!(matches!(
            PinataClient::from_config(&config),
            Err(PinError::MissingCredentials)
        ));

        let half = PinataConfig {
            api_key: Some("key".to_string()),
            secret_key: Some(String::new()),
            ..PinataConfig::default()
        };
        assert!(matches!(
            PinataClient::from_config(&half),
            Err(PinError::MissingCredentials)
        ));
    }

    #[test]
    fn test_endpoints() {
        let client = PinataClient::new("https://api.pinata.cloud/", "k", "s");
        assert_eq!(
            client.endpoint("pinFileToIPFS"),
            "https://api.pinata.cloud/pinning/pinFileToIPFS"
        );
        assert_eq!(
            client.endpoint("pinJSONToIPFS"),
            "https://api.pinata.cloud/pinning/pinJSONToIPFS"
        );
    }

    #[test]
    fn test_response_field() {
        let parsed: PinResponse =
            serde_json::from_str(r#"{"IpfsHash":"QmX","PinSize":1,"Timestamp":"t"}"#).unwrap();
        assert_eq!(parsed.ipfs_hash, "QmX");
    }

    #[test]
    fn test_file_form_rejects_bad_mime() {
        assert!(file_form("meme.png", vec![1, 2, 3], "image/png").is_ok());
        assert!(file_form("meme.png", vec![1, 2, 3], "not a mime").is_err());
    }
}
