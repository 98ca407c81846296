use anyhow::{Error, Result};
use product_notifier::{api::run_api_server, config::Config, utils::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::load()?;

    info!("Configuration validated. Custom handler is ready to start.");

    run_api_server(config).await
}
