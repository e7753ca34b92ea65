use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ecr::error::SdkError;
use aws_sdk_ecr::operation::create_repository::CreateRepositoryError;
use aws_sdk_ecr::Client as EcrClient;
use base64::Engine;

use super::{ImageRef, MirrorRegistry};

/// Session name used when assuming the destination-account role.
const ROLE_SESSION_NAME: &str = "ECRCopySession";

/// Extract a clean error message from an AWS SDK error's Debug output.
///
/// SDK errors have verbose Debug output; pull out just the `message: Some("...")`
/// field when present.
fn sdk_error_message<E: std::fmt::Debug>(err: &E) -> String {
    let debug_str = format!("{err:?}");

    if let Some(start) = debug_str.find("message: Some(\"") {
        let start = start + 15; // length of 'message: Some("'
        if let Some(end) = debug_str[start..].find("\")") {
            return debug_str[start..start + end].to_string();
        }
    }

    if debug_str.len() > 200 {
        format!("{}...", &debug_str[..200])
    } else {
        debug_str
    }
}

/// Whether a CreateRepository failure means the repository is already there,
/// which counts as success for provisioning.
fn creation_already_exists<R>(err: &SdkError<CreateRepositoryError, R>) -> bool {
    err.as_service_error()
        .map(CreateRepositoryError::is_repository_already_exists_exception)
        .unwrap_or(false)
}

/// An ECR registry in a specific account and region.
pub struct EcrRegistry {
    client: EcrClient,
    host: String,
}

impl EcrRegistry {
    /// Connect using the ambient credential chain (the function's own role).
    pub async fn connect(account_id: &str, region: &str) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Ok(Self::from_config(&aws_config, account_id, region))
    }

    /// Connect to a registry in another account by assuming a role there.
    pub async fn connect_assumed(
        base_config: &SdkConfig,
        role_arn: &str,
        account_id: &str,
        region: &str,
    ) -> Result<Self> {
        let sts = aws_sdk_sts::Client::new(base_config);

        let assumed = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(ROLE_SESSION_NAME)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!("Failed to assume role '{}': {}", role_arn, sdk_error_message(&e))
            })?;

        let creds = assumed
            .credentials()
            .context("No credentials returned from AssumeRole")?;

        let provider = aws_sdk_ecr::config::Credentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_string()),
            None,
            "assume-role",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Ok(Self::from_config(&aws_config, account_id, region))
    }

    fn from_config(aws_config: &SdkConfig, account_id: &str, region: &str) -> Self {
        let host = format!("{}.dkr.ecr.{}.amazonaws.com", account_id, region);
        Self {
            client: EcrClient::new(aws_config),
            host,
        }
    }
}

#[async_trait]
impl MirrorRegistry for EcrRegistry {
    fn host(&self) -> &str {
        &self.host
    }

    async fn ensure_repository(&self, repository: &str) -> Result<()> {
        match self
            .client
            .create_repository()
            .repository_name(repository)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!("Created repository: {}", repository);
                Ok(())
            }
            Err(err) if creation_already_exists(&err) => {
                tracing::info!("Repository already exists: {}", repository);
                Ok(())
            }
            Err(err) => Err(anyhow::anyhow!(
                "Failed to create repository '{}': {}",
                repository,
                sdk_error_message(&err)
            )),
        }
    }

    async fn authorization_password(&self) -> Result<String> {
        let response = self
            .client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to get authorization token for {}: {}",
                    self.host,
                    sdk_error_message(&e)
                )
            })?;

        let auth_data = response
            .authorization_data()
            .first()
            .context("No authorization data returned from ECR")?;

        let token = auth_data
            .authorization_token()
            .context("No authorization token in response")?;

        // Token is base64("AWS:password")
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(token)
            .context("Failed to decode ECR token")?;
        let decoded_str = String::from_utf8(decoded).context("ECR token is not valid UTF-8")?;

        let password = decoded_str
            .split_once(':')
            .map(|(_, password)| password.to_string())
            .context("Invalid ECR token format")?;

        Ok(password)
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRef>> {
        let mut images = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_images().repository_name(repository);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request.send().await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to list images of '{}': {}",
                    repository,
                    sdk_error_message(&e)
                )
            })?;

            for id in response.image_ids() {
                images.push(ImageRef {
                    tag: id.image_tag().map(str::to_string),
                    digest: id.image_digest().map(str::to_string),
                });
            }

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecr::types::error::{InvalidParameterException, RepositoryAlreadyExistsException};

    #[test]
    fn already_exists_creation_error_is_tolerated() {
        let err = SdkError::service_error(
            CreateRepositoryError::RepositoryAlreadyExistsException(
                RepositoryAlreadyExistsException::builder().build(),
            ),
            (),
        );
        assert!(creation_already_exists(&err));
    }

    #[test]
    fn other_creation_errors_are_not_tolerated() {
        let err = SdkError::service_error(
            CreateRepositoryError::InvalidParameterException(
                InvalidParameterException::builder().build(),
            ),
            (),
        );
        assert!(!creation_already_exists(&err));
    }

    #[test]
    fn non_service_creation_errors_are_not_tolerated() {
        let err = SdkError::<CreateRepositoryError, ()>::timeout_error("request timed out");
        assert!(!creation_already_exists(&err));
    }

    struct OpaqueError(String);

    impl std::fmt::Debug for OpaqueError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[test]
    fn sdk_error_message_extracts_message_field() {
        let err = OpaqueError(
            r#"ServiceError { message: Some("Repository not found"), code: None }"#.to_string(),
        );
        assert_eq!(sdk_error_message(&err), "Repository not found");
    }

    #[test]
    fn sdk_error_message_truncates_long_debug_output() {
        let err = OpaqueError("x".repeat(300));
        assert_eq!(sdk_error_message(&err), format!("{}...", "x".repeat(200)));
    }

    #[test]
    fn sdk_error_message_passes_short_output_through() {
        let err = OpaqueError("connection reset".to_string());
        assert_eq!(sdk_error_message(&err), "connection reset");
    }
}
