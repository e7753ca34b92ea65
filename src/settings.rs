use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Runtime configuration for a mirror invocation.
///
/// All values come from the function environment and are required; a missing
/// variable surfaces as a `ConfigError` before any AWS call is made.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Region of the source registry (e.g., "eu-west-1")
    pub source_region: String,
    /// Region of the destination registry
    pub dest_region: String,
    /// AWS account ID owning the source registry
    pub source_account_id: String,
    /// AWS account ID owning the destination registry
    pub dest_account_id: String,
    /// Role ARN to assume for destination-account operations
    pub dest_role_arn: String,
    /// SNS topic ARN for failure notifications
    pub notify_topic: String,
}

impl Settings {
    /// Load settings from the process environment (SOURCE_REGION, DEST_REGION,
    /// SOURCE_ACCOUNT_ID, DEST_ACCOUNT_ID, DEST_ROLE_ARN, NOTIFY_TOPIC).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
