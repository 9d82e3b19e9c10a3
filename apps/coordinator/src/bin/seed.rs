//! Development-environment seeder: registers a coordinator-owned user
//! and credits its account, so a freshly created database has something
//! to submit jobs against before any worker has ever said hello.

use dotenvy::dotenv;
use gridx_infra_store::{CreditsRepository, StoreClient, UsersRepository};
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").with_target(false).init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "gridx.db".to_string());
    let database_token = std::env::var("TURSO_AUTH_TOKEN").ok();

    let store = match StoreClient::connect(&database_url, database_token).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to connect to store");
            return Err(anyhow::anyhow!(e));
        }
    };

    let users = UsersRepository::new(store.clone());
    let credits = CreditsRepository::new(store);

    let coordinator_owner =
        std::env::var("GRIDX_COORDINATOR_OWNER").unwrap_or_else(|_| "coordinator".to_string());
    let initial_credits: f64 = std::env::var("GRIDX_INITIAL_CREDITS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100.0);

    let token = Uuid::new_v4().to_string();
    let user = users.register(&coordinator_owner, &token).await?;
    credits.ensure_user(&user.user_id, initial_credits).await?;

    info!(user_id = %user.user_id, credential_token = %token, "seeded coordinator-owned user");
    info!("seed complete");
    Ok(())
}
