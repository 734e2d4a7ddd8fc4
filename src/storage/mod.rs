//! Object storage for listing photos.

use reqwest::{multipart, Client};

use crate::error::Error;

/// Client for the backend's object storage.
pub struct StorageClient {
    url: String,
    key: String,
    bearer: Option<String>,
    client: Client,
}

/// Handle on one storage bucket.
pub struct BucketClient<'a> {
    storage: &'a StorageClient,
    bucket_id: String,
}

impl StorageClient {
    pub(crate) fn new(url: &str, key: &str, bearer: Option<String>, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            bearer,
            client,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    /// Get a client for a specific bucket
    pub fn from(&self, bucket_id: &str) -> BucketClient {
        BucketClient {
            storage: self,
            bucket_id: bucket_id.to_string(),
        }
    }
}

impl<'a> BucketClient<'a> {
    /// Upload `data` to `path` inside the bucket.
    pub async fn upload(&self, path: &str, data: Vec<u8>) -> Result<(), Error> {
        let url = self
            .storage
            .object_url(&format!("/object/{}/{}", self.bucket_id, path));

        let file_name = path
            .rsplit('/')
            .next()
            .unwrap_or("file")
            .to_string();

        let form =
            multipart::Form::new().part("file", multipart::Part::bytes(data).file_name(file_name));

        let mut request = self
            .storage
            .client
            .post(&url)
            .header("apikey", &self.storage.key)
            .header("Cache-Control", "3600");
        if let Some(token) = &self.storage.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::storage(format!(
                "upload failed with status {}: {}",
                status, text
            )));
        }

        Ok(())
    }

    /// The public URL a stored object resolves to.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.storage.url, self.bucket_id, path
        )
    }
}

/// Generate a per-user object path for a listing photo, keeping the original
/// file extension.
pub fn item_image_path(user_id: &str, original_name: &str) -> String {
    let ext = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("jpg");
    format!("{}/{}.{}", user_id, uuid::Uuid::new_v4(), ext)
}
