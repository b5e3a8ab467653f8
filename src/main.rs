mod auth;
mod entities;
mod errors;
mod permissions;
mod query;
mod settings;
mod storage;
mod web;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use migration::MigratorTrait;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

use auth::verifier::HttpTokenVerifier;
use auth::AuthGate;
use permissions::PermissionKind;

#[derive(Parser, Debug)]
#[command(name = "lectern", version, about = "Library catalog service")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database) and apply schema
    let db = storage::init(&settings.database).await.into_diagnostic()?;
    migration::Migrator::up(&db, None).await.into_diagnostic()?;

    // ensure the admin principal holds a non-expiring FULL grant
    ensure_admin(&db, &settings).await?;

    // authorization core with its verification cache
    let verifier = Arc::new(HttpTokenVerifier::new(settings.auth.token_info_url.clone()));
    let auth = AuthGate::new(
        verifier,
        settings.auth.allowed_domains.clone(),
        settings.auth.verify_cache_capacity,
        Duration::from_secs(settings.auth.verify_cache_ttl_secs),
    );

    // start web server
    web::serve(settings, db, auth).await?;
    Ok(())
}

async fn ensure_admin(
    db: &sea_orm::DatabaseConnection,
    settings: &settings::Settings,
) -> Result<()> {
    let admin = storage::upsert_principal_by_email(db, &settings.auth.admin_email)
        .await
        .into_diagnostic()?;
    let kinds = storage::active_permission_kinds(db, admin.id)
        .await
        .into_diagnostic()?;
    if !kinds.contains(&PermissionKind::Full) {
        storage::register_permission(db, admin.id, PermissionKind::Full, None)
            .await
            .into_diagnostic()?;
        tracing::info!("Granted FULL access to {}", settings.auth.admin_email);
    }
    Ok(())
}
