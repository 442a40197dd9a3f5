use aws_config::BehaviorVersion;
use aws_sdk_sqs::{
    Client,
    config::{Builder, Credentials, Region},
};
use secrecy::ExposeSecret;

use super::ClientSettings;

pub async fn create_sqs_client(settings: &ClientSettings) -> Client {
    let region = Region::new(settings.get_region().to_owned());
    let mut loader = aws_config::defaults(BehaviorVersion::v2025_08_07()).region(region.clone());
    if let Some(endpoint_url) = settings.get_endpoint_url() {
        loader = loader.endpoint_url(endpoint_url.as_str());
    }
    let base_config = loader.load().await;

    let mut builder = Builder::from(&base_config).region(region);
    if let Some((access_key_id, secret_access_key)) = settings.get_credentials() {
        builder = builder.credentials_provider(Credentials::new(
            access_key_id,
            secret_access_key.expose_secret(),
            None,
            None,
            "User",
        ));
    }
    Client::from_conf(builder.build())
}
