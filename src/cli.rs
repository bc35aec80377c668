//! Command runners
//!
//! One-shot commands build a fresh session per invocation; `serve` keeps one
//! session alive behind the console API.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::console::{ConsoleState, create_console_router};
use crate::integration::surface::{BrowserLauncher, ManualLauncher, SurfaceCloser, SurfaceLauncher};
use crate::integration::types::{ContactFields, ContactOperation, IntegrationType, SessionIdentity};
use crate::integration::{BackendClient, CompletionPoller, ConsoleSession, Handshake, PassThrough};
use crate::model::arg::{Command, IdentityArgs};
use crate::model::config::Config;

pub async fn run(command: Command, mut config: Config) -> anyhow::Result<()> {
    let backend = BackendClient::from_config(&config).context("Failed to create backend client")?;
    tracing::debug!(backend = %backend.origin(), "Backend client ready");

    match command {
        Command::Connect { target, no_browser } => {
            let identity = resolve_identity(&config, &target.identity, target.integration.into());
            run_connect(&config, backend, identity, no_browser).await
        }
        Command::Load { target } => {
            let identity = resolve_identity(&config, &target.identity, target.integration.into());
            run_load(&config, backend, identity).await
        }
        Command::Contact {
            operation,
            identity,
            contact_id,
            properties,
        } => {
            let identity = resolve_identity(&config, &identity, IntegrationType::Hubspot);
            let fields = ContactFields {
                contact_id,
                properties_str: properties,
            };
            run_contact(&config, backend, identity, operation.into(), fields).await
        }
        Command::Serve {
            host,
            port,
            no_browser,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_serve(&config, backend, no_browser).await
        }
    }
}

fn resolve_identity(
    config: &Config,
    args: &IdentityArgs,
    integration: IntegrationType,
) -> SessionIdentity {
    SessionIdentity::new(
        args.user.clone().unwrap_or_else(|| config.default_user.clone()),
        args.org.clone().unwrap_or_else(|| config.default_org.clone()),
        integration,
    )
}

fn launcher(no_browser: bool) -> Arc<dyn SurfaceLauncher> {
    if no_browser {
        Arc::new(ManualLauncher)
    } else {
        Arc::new(BrowserLauncher)
    }
}

fn handshake(config: &Config, backend: BackendClient, no_browser: bool) -> Handshake {
    Handshake::new(
        backend,
        launcher(no_browser),
        CompletionPoller::from_config(config),
    )
}

async fn run_connect(
    config: &Config,
    backend: BackendClient,
    identity: SessionIdentity,
    no_browser: bool,
) -> anyhow::Result<()> {
    let integration = identity.integration;
    let handshake = handshake(config, backend, no_browser);
    let session = ConsoleSession::new(identity);

    let pending = handshake.start(&session).await?;
    println!("Authorization URL: {}", pending.authorization_url());
    println!("Finish the authorization, close the window, then press Enter (Ctrl-C cancels).");

    close_on_enter(pending.surface.closer());
    let cancel = pending.attempt.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    handshake.finish(&session, pending).await?;
    println!("{} connected", integration);
    print_json(&session.snapshot())
}

async fn run_load(config: &Config, backend: BackendClient, identity: SessionIdentity) -> anyhow::Result<()> {
    let session = ConsoleSession::new(identity);
    handshake(config, backend.clone(), true).restore(&session).await?;

    let passthrough = PassThrough::new(backend, config.load_payload);
    let data = passthrough.load(&session).await?;
    print_json(&data)
}

async fn run_contact(
    config: &Config,
    backend: BackendClient,
    identity: SessionIdentity,
    operation: ContactOperation,
    fields: ContactFields,
) -> anyhow::Result<()> {
    let session = ConsoleSession::new(identity);
    handshake(config, backend.clone(), true).restore(&session).await?;

    let passthrough = PassThrough::new(backend, config.load_payload);
    let result = passthrough.contact(&session, operation, &fields).await?;
    print_json(&result)
}

async fn run_serve(config: &Config, backend: BackendClient, no_browser: bool) -> anyhow::Result<()> {
    let identity = SessionIdentity::new(
        config.default_user.clone(),
        config.default_org.clone(),
        IntegrationType::Hubspot,
    );
    let session = Arc::new(ConsoleSession::new(identity));
    let state = ConsoleState::new(
        session,
        handshake(config, backend.clone(), no_browser),
        PassThrough::new(backend, config.load_payload),
        config.effective_admin_api_key(),
    );
    let app = axum::Router::new().nest("/api", create_console_router(state, &config.cors_origins));

    if config.effective_admin_api_key().is_none() {
        tracing::warn!("adminApiKey not set, console API is unauthenticated");
    }

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting console API: {}", addr);
    tracing::info!("Available APIs:");
    tracing::info!("  GET    /api/session");
    tracing::info!("  DELETE /api/session");
    tracing::info!("  PUT    /api/session/identity");
    tracing::info!("  POST   /api/session/connect");
    tracing::info!("  POST   /api/session/surface/closed");
    tracing::info!("  POST   /api/session/cancel");
    tracing::info!("  POST   /api/data/load");
    tracing::info!("  POST   /api/contacts/{{get|create|update|delete}}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Console API server failed")?;
    Ok(())
}

/// Close the surface when the operator presses Enter (or stdin reaches EOF)
///
/// Runs on a plain thread: a blocking stdin read cannot be cancelled and must
/// not hold up runtime shutdown.
fn close_on_enter(closer: SurfaceCloser) {
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        closer.close();
    });
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{}", rendered);
    Ok(())
}
