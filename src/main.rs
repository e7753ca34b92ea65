use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecr_mirror::mirror::MirrorResult;

async fn function_handler(event: LambdaEvent<Value>) -> Result<MirrorResult, lambda_runtime::Error> {
    ecr_mirror::handle(event.payload).await.map_err(Into::into)
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    lambda_runtime::run(service_fn(function_handler)).await
}
