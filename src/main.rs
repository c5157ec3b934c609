use beacon::{config_loader, logger, metrics, Proxy, Router};
use log::error;

#[tokio::main]
async fn main() -> beacon::Result<()> {
    // Load the configuration, seeding a default file on first run.
    let config = config_loader::load_config("config.yml")?;
    logger::init_logger(config.debug);

    println!("beacon // hostname front door for the Minecraft protocol");
    println!("// serving on port {}", config.port);

    let router = Router::new();
    config_loader::apply(&config, &router);

    if config.prometheus_exporter.enabled {
        match config.prometheus_exporter.bind_address.parse() {
            Ok(addr) => metrics::spawn_metrics_server(addr),
            Err(err) => error!(
                "invalid exporter bind address '{}': {}",
                config.prometheus_exporter.bind_address, err
            ),
        }
    }

    Proxy::new(router).listen(config.port).await?;
    Ok(())
}
