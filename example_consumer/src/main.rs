//! Example consumer: serves the entities listed in `ENTITY_CONFIG` over HTTP.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Settings come from the environment or a `.env` file (`DATABASE_URL`, `BIND_ADDR`, ...).

use schema_query::{app, init_tracing, load_registry, AppState, PgSchemaSource, SchemaCatalog, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    init_tracing("schema_query=info,example_consumer=info");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;

    let registry = load_registry(&settings.entity_config, &settings.default_schema).await?;
    let catalog = SchemaCatalog::new(Arc::new(PgSchemaSource::new(pool.clone())));
    let state = AppState::new(pool, registry, catalog, settings.max_page_size);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
