//! Replication diagnostic.
//!
//! Mirrors what the app does at session start: restore (or sign in), pull,
//! then push everything. Prints one line per step and exits non-zero on
//! the first failure, so it can double as a smoke check against a fresh
//! Supabase project.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studentpro_lib::config::{default_config_path, AppConfig};
use studentpro_lib::remote::RemoteConfig;
use studentpro_lib::services::session;
use studentpro_lib::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = std::env::var("SUPABASE_URL").context("SUPABASE_URL is not set")?;
    let api_key = std::env::var("SUPABASE_KEY").context("SUPABASE_KEY is not set")?;

    let config = AppConfig::load_or_default(&default_config_path());
    println!("store: {}", config.database_path.display());

    let state = AppState::connect(config, RemoteConfig { base_url, api_key })
        .context("could not open the local store")?;

    let restored = session::restore(&state).await?;
    let user = match restored {
        Some(user) => user,
        None => match (
            std::env::var("STUDENTPRO_EMAIL"),
            std::env::var("STUDENTPRO_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => session::sign_in(&state, &email, &password)
                .await
                .context("sign-in failed")?,
            _ => {
                println!("❌ no stored session; set STUDENTPRO_EMAIL and STUDENTPRO_PASSWORD to sign in");
                std::process::exit(1);
            }
        },
    };
    println!("✅ signed in as {}", user.email);

    match session::download_all(&state).await {
        Ok(stats) => println!(
            "✅ pull: {} semesters, {} subjects, {} chapters, {} sessions",
            stats.semesters, stats.subjects, stats.chapters, stats.sessions
        ),
        Err(e) => {
            println!("❌ pull failed: {e}");
            std::process::exit(1);
        }
    }

    match session::upload_all(&state).await {
        Ok(stats) => println!(
            "✅ push: {} semesters, {} subjects, {} chapters, {} sessions, {} queued ops flushed",
            stats.semesters, stats.subjects, stats.chapters, stats.sessions, stats.queue_flushed
        ),
        Err(e) => {
            println!("❌ push failed: {e}");
            std::process::exit(1);
        }
    }

    let sync_state = session::sync_state(&state).await?;
    println!("✅ queue: {} pending", sync_state.pending_pushes);

    Ok(())
}
