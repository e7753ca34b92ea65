use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::Client as SnsClient;

/// Best-effort failure reporting channel.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify_failure(&self, repository: &str, error: &str) -> Result<()>;
}

/// Publishes failure notices to an SNS topic.
pub struct SnsNotifier {
    client: SnsClient,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(aws_config: &SdkConfig, topic_arn: String) -> Self {
        Self {
            client: SnsClient::new(aws_config),
            topic_arn,
        }
    }
}

#[async_trait]
impl FailureNotifier for SnsNotifier {
    async fn notify_failure(&self, repository: &str, error: &str) -> Result<()> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(format!(
                "Failed to copy repository {}: {}",
                repository, error
            ))
            .send()
            .await?;

        Ok(())
    }
}
