use anyhow::Result;
use later::{
    app_state::AppState,
    config::{Config, ItemStoreKind},
    repositories::{InMemoryItemRepository, ItemRepository, ItemRepositoryTrait},
    resolver::UrlResolver,
    router::router,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let repo: Arc<dyn ItemRepositoryTrait> = match config.item_store() {
        ItemStoreKind::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(config.database_url())
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(ItemRepository::new(pool))
        }
        ItemStoreKind::Memory => Arc::new(InMemoryItemRepository::new()),
    };
    let resolver = Arc::new(UrlResolver::from_config(&config)?);

    let app = router(AppState::new(repo, resolver));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %config.bind_addr(),
        store = ?config.item_store(),
        "later api listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
