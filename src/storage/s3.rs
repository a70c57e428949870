use super::{NewObject, ObjectHead, ObjectStore, StorageError, StoredObject};
use crate::aws::Clients;
use rocket::tokio::io::AsyncReadExt;
use rusoto_core::{Region, RusotoError};
use rusoto_credential::AwsCredentials;
use rusoto_s3::util::{PreSignedRequest, PreSignedRequestOption};
use rusoto_s3::{
  DeleteObjectRequest, GetObjectAclRequest, GetObjectError, GetObjectRequest, Grant,
  HeadObjectError, HeadObjectRequest, PutObjectRequest, S3Client, S3,
};
use std::time::Duration;

pub struct S3ObjectStore {
  client: S3Client,
  bucket: String,
  region: Region,
  credentials: AwsCredentials,
}

const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

impl S3ObjectStore {
  pub fn new(clients: &Clients, bucket: String) -> Self {
    Self::with_client(
      clients.s3.clone(),
      bucket,
      clients.region.clone(),
      clients.credentials.aws_credentials(),
    )
  }

  pub fn with_client(
    client: S3Client,
    bucket: String,
    region: Region,
    credentials: AwsCredentials,
  ) -> Self {
    Self {
      client,
      bucket,
      region,
      credentials,
    }
  }

  /// An unreadable ACL is treated as private.
  async fn canned_acl_of(&self, key: &str) -> Option<String> {
    let request = GetObjectAclRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      ..Default::default()
    };

    match self.client.get_object_acl(request).await {
      Ok(output) => canned_acl(&output.grants.unwrap_or_default()),
      Err(error) => {
        tracing::warn!(key, %error, "failed to read object acl");
        None
      }
    }
  }
}

/// Maps read grants for the global groups back to their canned ACL.
fn canned_acl(grants: &[Grant]) -> Option<String> {
  let readable_by = |group: &str| {
    grants.iter().any(|grant| {
      grant.permission.as_deref() == Some("READ")
        && grant
          .grantee
          .as_ref()
          .and_then(|grantee| grantee.uri.as_deref())
          == Some(group)
    })
  };

  if readable_by(ALL_USERS) {
    Some("public-read".to_owned())
  } else if readable_by(AUTHENTICATED_USERS) {
    Some("authenticated-read".to_owned())
  } else {
    None
  }
}

// HEAD responses carry no body, so a missing key surfaces as an unparsed 404.
fn is_missing<E>(error: &RusotoError<E>) -> bool {
  matches!(error, RusotoError::Unknown(response) if response.status.as_u16() == 404)
}

fn request_error<E: std::error::Error + 'static>(error: RusotoError<E>) -> StorageError {
  StorageError::Request(error.to_string())
}

#[rocket::async_trait]
impl ObjectStore for S3ObjectStore {
  async fn head(&self, key: &str) -> Result<ObjectHead, StorageError> {
    let request = HeadObjectRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      ..Default::default()
    };

    match self.client.head_object(request).await {
      Ok(output) => Ok(ObjectHead {
        metadata: output.metadata.unwrap_or_default(),
      }),
      Err(RusotoError::Service(HeadObjectError::NoSuchKey(_))) => {
        Err(StorageError::NotFound(key.to_owned()))
      }
      Err(error) if is_missing(&error) => Err(StorageError::NotFound(key.to_owned())),
      Err(error) => Err(request_error(error)),
    }
  }

  async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
    let request = GetObjectRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      ..Default::default()
    };

    let output = match self.client.get_object(request).await {
      Ok(output) => output,
      Err(RusotoError::Service(GetObjectError::NoSuchKey(_))) => {
        return Err(StorageError::NotFound(key.to_owned()))
      }
      Err(error) if is_missing(&error) => {
        return Err(StorageError::NotFound(key.to_owned()))
      }
      Err(error) => return Err(request_error(error)),
    };

    let mut body = Vec::new();

    if let Some(stream) = output.body {
      stream.into_async_read().read_to_end(&mut body).await?;
    }

    Ok(StoredObject {
      body,
      content_type: output.content_type,
      metadata: output.metadata.unwrap_or_default(),
      acl: self.canned_acl_of(key).await,
    })
  }

  async fn put(&self, key: &str, object: NewObject) -> Result<(), StorageError> {
    let request = PutObjectRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      body: Some(object.body.into()),
      content_type: Some(object.content_type),
      metadata: Some(object.metadata),
      acl: object.acl,
      ..Default::default()
    };

    self
      .client
      .put_object(request)
      .await
      .map_err(request_error)?;

    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StorageError> {
    let request = DeleteObjectRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      ..Default::default()
    };

    self
      .client
      .delete_object(request)
      .await
      .map_err(request_error)?;

    Ok(())
  }

  fn public_url(&self, key: &str) -> String {
    format!(
      "https://{}.s3.{}.amazonaws.com/{}",
      self.bucket,
      self.region.name(),
      key
    )
  }

  fn signed_url(&self, key: &str, expires_in: Duration) -> String {
    let request = GetObjectRequest {
      bucket: self.bucket.clone(),
      key: key.to_owned(),
      ..Default::default()
    };

    request.get_presigned_url(
      &self.region,
      &self.credentials,
      &PreSignedRequestOption { expires_in },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};
  use rusoto_s3::Grantee;

  fn store(dispatcher: MultipleMockRequestDispatcher<std::vec::IntoIter<MockRequestDispatcher>>) -> S3ObjectStore {
    S3ObjectStore::with_client(
      S3Client::new_with(dispatcher, MockCredentialsProvider, Region::UsEast1),
      "catalogue-assets".to_owned(),
      Region::UsEast1,
      AwsCredentials::new("key", "secret", None, None),
    )
  }

  fn group_grant(uri: &str, permission: &str) -> Grant {
    Grant {
      grantee: Some(Grantee {
        type_: "Group".to_owned(),
        uri: Some(uri.to_owned()),
        ..Default::default()
      }),
      permission: Some(permission.to_owned()),
    }
  }

  #[test]
  fn maps_group_grants_to_canned_acls() {
    assert_eq!(
      canned_acl(&[group_grant(ALL_USERS, "READ")]).as_deref(),
      Some("public-read")
    );
    assert_eq!(
      canned_acl(&[group_grant(AUTHENTICATED_USERS, "READ")]).as_deref(),
      Some("authenticated-read")
    );
    assert_eq!(canned_acl(&[group_grant(ALL_USERS, "WRITE")]), None);
    assert_eq!(canned_acl(&[]), None);
  }

  #[tokio::test]
  async fn head_of_a_missing_key_is_not_found() {
    let store = store(MultipleMockRequestDispatcher::new(vec![
      MockRequestDispatcher::with_status(404),
    ]));

    let result = store.head("game-images/gone.png").await;

    assert!(matches!(result, Err(StorageError::NotFound(key)) if key == "game-images/gone.png"));
  }

  #[tokio::test]
  async fn head_server_errors_are_request_errors() {
    let store = store(MultipleMockRequestDispatcher::new(vec![
      MockRequestDispatcher::with_status(500),
    ]));

    let result = store.head("game-images/cover.png").await;

    assert!(matches!(result, Err(StorageError::Request(_))));
  }

  #[tokio::test]
  async fn unreadable_acl_reads_as_private() {
    let store = store(MultipleMockRequestDispatcher::new(vec![
      MockRequestDispatcher::with_status(200).with_body("pixels"),
      MockRequestDispatcher::with_status(403),
    ]));

    let object = store.get("game-images/cover.png").await.unwrap();

    assert_eq!(object.body, b"pixels".to_vec());
    assert_eq!(object.acl, None);
  }
}
