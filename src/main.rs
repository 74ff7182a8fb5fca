use std::sync::Arc;

use anyhow::{Context, Result};
use calkeep_auth::{GoogleOAuth2Provider, StoredTokenAuthorizer, TokenStore};
use calkeep_calendar::{format_event_summary, CalendarAdapter, GoogleCalendarClient, LoadRange, SummaryOptions};
use calkeep_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, validation) = Config::load_validated().context("Failed to load configuration")?;
    calkeep_core::init_logging(&config.logging.level)?;

    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let token_dir = config.google.effective_token_dir(&config.config_dir);
    let mut authorizer =
        StoredTokenAuthorizer::new(TokenStore::new(token_dir), config.google.token_service.clone());
    if let (true, Some(id), Some(secret)) = (
        config.google.is_configured(),
        config.google.client_id.clone(),
        config.google.client_secret.clone(),
    ) {
        authorizer = authorizer.with_refresh(GoogleOAuth2Provider::with_token_url(
            id,
            secret,
            &config.google.token_url,
        ));
    }
    let authorizer = Arc::new(authorizer);
    let client = GoogleCalendarClient::from_config(&config.google)?;

    let now = chrono::Utc::now();
    let mut range = LoadRange::new(
        now,
        now + chrono::Duration::days(i64::from(config.display.lookahead_days)),
    );
    range.text_search = config.display.text_search.clone();

    let options = SummaryOptions {
        show_time_zones: config.display.show_time_zones,
    };

    for calendar in &config.calendars {
        let mut adapter = CalendarAdapter::from_config(calendar, authorizer.clone(), client.clone())?;

        match adapter.load_events_into_cache(&range).await {
            Ok(_) => {
                println!("{} ({} events)", adapter.name(), adapter.events().len());
                for event in adapter.events() {
                    match format_event_summary(event, options) {
                        Ok(line) => println!("  {}", line),
                        Err(e) => tracing::warn!("Skipping event: {}", e),
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to load {}: {}", adapter.name(), e);
                eprintln!("{}: {}", adapter.name(), e.user_message());
            }
        }
    }

    Ok(())
}
