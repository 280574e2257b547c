//! One-shot admin account seeder.
//!
//! Reads ADMIN_NAME, ADMIN_EMAIL, ADMIN_MOBILE and ADMIN_PASSWORD from the
//! environment and creates the admin user if no account with that email
//! exists yet. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seed_admin

use rust_funnel_api::config::Config;
use rust_funnel_api::db::Database;
use rust_funnel_api::models::{CreateUserDto, UserRole};
use rust_funnel_api::users::UserStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable required", key))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_admin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url).await?;
    let users = UserStore::new(db.pool);

    let email = env_required("ADMIN_EMAIL")?;
    if let Some(existing) = users.find_by_email(&email).await.map_err(|e| anyhow::anyhow!("{}", e))? {
        tracing::info!("Admin already present: {} ({})", existing.name, existing.email);
        return Ok(());
    }

    let dto = CreateUserDto {
        name: env_required("ADMIN_NAME")?,
        email,
        mobile: env_required("ADMIN_MOBILE")?,
        password: env_required("ADMIN_PASSWORD")?,
        role: UserRole::Admin,
        is_active: Some(true),
    };

    let user = users
        .create(dto)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    tracing::info!("Admin user created: {} ({})", user.name, user.email);

    Ok(())
}
