use crate::config::{Config, InvalidRegion};
use hyper_tls::HttpsConnector;
use rusoto_core::credential::{AwsCredentials, CredentialsError, ProvideAwsCredentials};
use rusoto_core::{HttpClient, Region};
use rusoto_dynamodb::DynamoDbClient;
use rusoto_s3::S3Client;
use rusoto_sns::SnsClient;
use rusoto_sqs::SqsClient;

#[derive(Clone)]
pub struct ConfigCredentialsProvider {
  access_key_id: String,
  secret_key: String,
}

impl ConfigCredentialsProvider {
  pub fn new(config: &Config) -> Self {
    Self {
      access_key_id: config.aws_access_key_id.clone(),
      secret_key: config.aws_secret_key.clone(),
    }
  }

  pub fn aws_credentials(&self) -> AwsCredentials {
    AwsCredentials::new(
      self.access_key_id.clone(),
      self.secret_key.clone(),
      None,
      None,
    )
  }
}

#[rocket::async_trait]
impl ProvideAwsCredentials for ConfigCredentialsProvider {
  async fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
    Ok(self.aws_credentials())
  }
}

/// AWS clients built once at startup and shared by every store.
#[derive(Clone)]
pub struct Clients {
  pub region: Region,
  pub credentials: ConfigCredentialsProvider,
  pub s3: S3Client,
  pub dynamo: DynamoDbClient,
  pub sns: SnsClient,
  pub sqs: SqsClient,
}

impl Clients {
  pub fn new(config: &Config) -> Result<Self, InvalidRegion> {
    let region = config.region()?;
    let credentials = ConfigCredentialsProvider::new(config);

    Ok(Self {
      s3: S3Client::new_with(
        HttpClient::from_connector(HttpsConnector::new()),
        credentials.clone(),
        region.clone(),
      ),
      dynamo: DynamoDbClient::new_with(
        HttpClient::from_connector(HttpsConnector::new()),
        credentials.clone(),
        region.clone(),
      ),
      sns: SnsClient::new_with(
        HttpClient::from_connector(HttpsConnector::new()),
        credentials.clone(),
        region.clone(),
      ),
      sqs: SqsClient::new_with(
        HttpClient::from_connector(HttpsConnector::new()),
        credentials.clone(),
        region.clone(),
      ),
      region,
      credentials,
    })
  }
}
