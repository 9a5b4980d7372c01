use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use payments_api::{
    config::Config,
    mocks::{mock_scope, MockBehavior, MockState},
};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    payments_api::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    let behavior = MockBehavior::from(&config.mocks);
    let state = web::Data::new(MockState::new(behavior));

    info!(
        failure_rate = behavior.failure_rate,
        max_latency_ms = behavior.max_latency.as_millis() as u64,
        "Starting mock providers on {}:{}",
        config.mocks.host,
        config.mocks.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .service(mock_scope(state.clone()))
    })
    .bind((config.mocks.host.clone(), config.mocks.port))?
    .run()
    .await?;

    Ok(())
}
