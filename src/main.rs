use log::{error, info, LevelFilter};
use log4rs_dynamic_filters::{default_deserializers, DynamicLevelFilter};
use thiserror::Error;

const LOG_CONFIG: &str = "log4rs.yaml";

/// Failures that take the whole server down.
#[derive(Debug, Error)]
enum Error {
    #[error("Server failed to start: {0}")]
    Ignition(#[source] rocket::Error),
    #[error("Server stopped unexpectedly: {0}")]
    Launch(#[source] rocket::Error),
}

async fn serve() -> Result<(), Error> {
    info!("Starting poll server...");
    let rocket = poll_backend::build()
        .ignite()
        .await
        .map_err(Error::Ignition)?;

    // Requests are logged by our own fairing from here on.
    DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await.map_err(Error::Launch)?;
    info!("Poll server stopped");
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file(LOG_CONFIG, default_deserializers())
        .expect("Failed to initialise logging");

    if let Err(err) = serve().await {
        error!("{err}");
        std::process::exit(1)
    }
}
