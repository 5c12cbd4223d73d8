/// HTTP client for the media storage gateway.
///
/// Uploads send multipart form data and get back a hosted URL plus a
/// public id used for later deletion. Deletions are best-effort side
/// effects and go through [`destroy_in_background`].

use serde::Deserialize;
use serde::Serialize;

/// A stored media asset as the gateway reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAsset {
    pub url: String,
    pub public_id: String,
}

#[derive(Clone)]
pub struct MediaClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl MediaClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        folder: &str,
    ) -> Result<StoredAsset, String> {
        let url = format!("{}/upload", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("folder", folder.to_string());

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let body: UploadResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(StoredAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    pub async fn destroy(&self, public_id: &str) -> Result<(), String> {
        let url = format!("{}/destroy", self.base_url);
        self.http_client
            .post(&url)
            .json(&serde_json::json!({ "public_id": public_id }))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Deletes an asset on a detached task. An empty public id means the
/// record still carries its placeholder asset and there is nothing to
/// delete.
pub fn destroy_in_background(client: &MediaClient, public_id: String) {
    if public_id.is_empty() {
        return;
    }
    let client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = client.destroy(&public_id).await {
            tracing::warn!(public_id = %public_id, error = %e, "failed to delete media asset");
        }
    });
}
