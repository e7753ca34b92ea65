pub mod event;
pub mod mirror;
pub mod notify;
pub mod registry;
pub mod settings;
pub mod tool;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use serde_json::Value;
use tracing::{error, info};

use event::MirrorEvent;
use mirror::MirrorResult;
use notify::SnsNotifier;
use registry::ecr::EcrRegistry;
use settings::Settings;
use tool::CraneCli;

/// Handle one mirror invocation end to end.
///
/// On any fatal error a single best-effort SNS notification is sent before
/// the error is returned to the Lambda runtime.
pub async fn handle(payload: Value) -> Result<MirrorResult> {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(config_err) => {
            let err = anyhow::Error::new(config_err).context("Failed to load configuration");
            report_config_failure(&err).await;
            return Err(err);
        }
    };

    info!("Event: {}", payload);
    let repository = MirrorEvent::from(payload).repository();
    info!("Repository: {}", repository);

    let base_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let notifier = SnsNotifier::new(&base_config, settings.notify_topic.clone());

    match mirror_with_aws(&settings, &base_config, &repository).await {
        Ok(result) => Ok(result),
        Err(err) => {
            mirror::report_failure(&notifier, &repository, &err).await;
            Err(err)
        }
    }
}

async fn mirror_with_aws(
    settings: &Settings,
    base_config: &aws_config::SdkConfig,
    repository: &str,
) -> Result<MirrorResult> {
    let source =
        EcrRegistry::connect(&settings.source_account_id, &settings.source_region).await?;

    let dest = EcrRegistry::connect_assumed(
        base_config,
        &settings.dest_role_arn,
        &settings.dest_account_id,
        &settings.dest_region,
    )
    .await?;

    // Invocation-scoped DOCKER_CONFIG so warm containers never share login state.
    let docker_config =
        tempfile::tempdir().context("Failed to create scratch DOCKER_CONFIG directory")?;
    let crane = CraneCli::new(docker_config.path());

    mirror::mirror_repository(repository, &source, &dest, &crane).await
}

/// A configuration failure happens before `Settings` (and with it the notifier)
/// exists, so the topic is read directly from the environment; without it the
/// failure can only be logged. The repository is not resolved yet either and is
/// reported as "unknown".
async fn report_config_failure(err: &anyhow::Error) {
    match std::env::var("NOTIFY_TOPIC") {
        Ok(topic) => {
            let base_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let notifier = SnsNotifier::new(&base_config, topic);
            mirror::report_failure(&notifier, "unknown", err).await;
        }
        Err(_) => {
            error!("Mirror of repository unknown failed: {:#}", err);
            error!("Failed to send failure notification: NOTIFY_TOPIC is not set");
        }
    }
}
