use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use autoserver::{configure, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting automation engine server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    let app_state = web::Data::new(AppState::from_config(&config));

    info!(
        "Runtime initialized with {} node types",
        app_state.runtime.registry().list_node_types().len()
    );
    if config.message_webhook_url.is_none() {
        info!("No MESSAGE_WEBHOOK_URL set, messages are logged only");
    }

    let bind_address = config.bind_address.clone();
    info!("Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
