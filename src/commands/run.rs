use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::Settings;
use crate::services::session_service;
use crate::utils::AppError;

pub async fn execute() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    debug!("Loaded settings: {:?}", settings);

    let http_client = HttpClient::builder()
        .timeout(settings.http_timeout)
        .build()?;

    info!(
        "💼 Starting wallet session for app {} (widget: {})",
        settings.markup_app_id,
        settings.output_path.display()
    );
    session_service::run(&settings, http_client).await?;
    info!("👋 Session finished");
    Ok(())
}
