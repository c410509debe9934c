use log::{info, warn};
use serde::Serialize;

use artnet_strip_core::api::{SettingsPatch, SettingsView, StatusView};
use artnet_strip_core::{Applied, ConfigurationError, LifecycleError, StripError};

use crate::app::with_runtime;
use crate::config;
use crate::net::http::{Error as HttpError, HttpConnection, HttpHandler, HttpMethod, HttpResult, StatusCode};

#[derive(Serialize)]
struct AppliedBody {
    applied: &'static str,
    settings: SettingsView,
}

/// Routes of the configuration API.
#[derive(Debug, Default)]
pub(crate) struct SettingsHttpController;

impl HttpHandler for SettingsHttpController {
    async fn handle_request(&self, conn: HttpConnection<'_>) -> HttpResult {
        let mut conn = conn;
        match conn.route() {
            (HttpMethod::Get, "/settings") => handle_get_settings(&mut conn).await,
            (HttpMethod::Post, "/settings") => handle_set_settings(&mut conn).await,
            (HttpMethod::Get, "/status") => handle_get_status(&mut conn).await,
            _ => conn.respond_error(404, "not found").await,
        }
    }
}

async fn handle_get_settings(conn: &mut HttpConnection<'_>) -> HttpResult {
    let view = with_runtime(|runtime| SettingsView::from(runtime.orchestrator.settings())).await;
    match view {
        Some(view) => conn.respond_json(200, &view).await,
        None => conn.respond_error(503, "starting").await,
    }
}

async fn handle_set_settings(conn: &mut HttpConnection<'_>) -> HttpResult {
    let patch = match conn.read_json::<SettingsPatch>().await {
        Ok(patch) => patch,
        Err(HttpError::TooLarge) => return conn.respond_error(413, "body too large").await,
        Err(HttpError::Parse | HttpError::NoData) => {
            return conn.respond_error(400, "expected a JSON object").await;
        }
        Err(e) => return Err(e),
    };

    let outcome = with_runtime(|runtime| {
        runtime
            .configuration
            .apply_patch(&mut runtime.orchestrator, &patch)
            .map(|applied| (applied, SettingsView::from(runtime.orchestrator.settings())))
    })
    .await;

    match outcome {
        Some(Ok((applied, settings))) => {
            info!("http: settings applied ({:?})", applied);
            let applied = match applied {
                Applied::InPlace => "inPlace",
                Applied::Rebuilt => "rebuilt",
            };
            conn.respond_json(200, &AppliedBody { applied, settings })
                .await
        }
        Some(Err(e)) => {
            warn!("http: settings rejected: {:?}", e);
            conn.respond_error(status_for(e), e.as_str()).await
        }
        None => conn.respond_error(503, "starting").await,
    }
}

async fn handle_get_status(conn: &mut HttpConnection<'_>) -> HttpResult {
    let view = with_runtime(|runtime| {
        let orchestrator = &runtime.orchestrator;
        StatusView::new(
            orchestrator.state(),
            orchestrator.is_suspended(),
            orchestrator.last_error(),
            config::FIRMWARE.version,
            runtime.stats.snapshot(),
        )
    })
    .await;
    match view {
        Some(view) => conn.respond_json(200, &view).await,
        None => conn.respond_error(503, "starting").await,
    }
}

fn status_for(error: ConfigurationError) -> StatusCode {
    match error {
        ConfigurationError::Invalid(_) => 400,
        ConfigurationError::Lifecycle(LifecycleError::ReconfigurationInProgress) => 409,
        ConfigurationError::Lifecycle(LifecycleError::Strip(StripError::Peripheral)) => 500,
        ConfigurationError::Lifecycle(LifecycleError::Settings(_) | LifecycleError::Strip(_)) => {
            400
        }
        ConfigurationError::Lifecycle(_) => 500,
    }
}
