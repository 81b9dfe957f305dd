use std::env::var;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Server;
use cap_std::{ambient_authority, fs::Dir};
use tower::{
    limit::GlobalConcurrencyLimitLayer, load_shed::LoadShedLayer, make::Shared, ServiceBuilder,
};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contact_book::{
    data_path_from_env,
    server::{flash::load_key, router},
    store::Contacts,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_path = data_path_from_env()?;

    let bind_addr = var("BIND_ADDR")
        .context("Environment variable BIND_ADDR not set")?
        .parse::<SocketAddr>()
        .context("Environment variable BIND_ADDR invalid")?;

    let request_limit = var("REQUEST_LIMIT")
        .context("Environment variable REQUEST_LIMIT not set")?
        .parse::<usize>()
        .context("Environment variable REQUEST_LIMIT invalid")?;

    let dir = Dir::open_ambient_dir(&data_path, ambient_authority())
        .with_context(|| format!("Failed to open data directory {}", data_path.display()))?;

    let key = load_key(&dir)?;

    let contacts = &*Box::leak(Box::new(Contacts::open(dir)?));

    tracing::info!("Loaded {} contacts", contacts.count());

    let make_service = Shared::new(
        ServiceBuilder::new()
            .layer(LoadShedLayer::new())
            .layer(GlobalConcurrencyLimitLayer::new(request_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::default().include_headers(true)),
            )
            .service(router(contacts, key)),
    );

    tracing::info!("Listening on {}", bind_addr);
    Server::bind(&bind_addr).serve(make_service).await?;

    Ok(())
}
