mod buckets;
mod s3_client;
mod sqs_client;
mod sts_client;

pub use buckets::list_buckets;
pub use s3_client::create_s3_client;
pub use sqs_client::create_sqs_client;
pub use sts_client::create_sts_client;

use secrecy::SecretString;
use url::Url;

/// Connection settings shared by the service client factories. Credentials
/// are optional; when absent the SDK's default provider chain is used.
#[derive(Clone)]
pub struct ClientSettings {
    region: String,
    endpoint_url: Option<Url>,
    access_key_id: Option<String>,
    secret_access_key: Option<SecretString>,
}

impl ClientSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    /// Point the clients at a custom endpoint, e.g. a MinIO or LocalStack
    /// deployment.
    pub fn with_endpoint_url(mut self, endpoint_url: Url) -> Self {
        self.endpoint_url = Some(endpoint_url);
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: SecretString,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key);
        self
    }

    pub fn get_region(&self) -> &str {
        &self.region
    }

    pub fn get_endpoint_url(&self) -> Option<&Url> {
        self.endpoint_url.as_ref()
    }

    pub fn get_credentials(&self) -> Option<(&str, &SecretString)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret)),
            _ => None,
        }
    }
}
