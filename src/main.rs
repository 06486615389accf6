use folio::logger::Logger;
use folio::{server, Config, WikiError};

#[tokio::main]
async fn main() -> Result<(), WikiError> {
    if let Err(e) = Logger::init() {
        eprintln!("Failed to install logger: {}", e);
    }

    let config = Config::from_env()?;
    log::debug!("Starting with {:?}", config);
    server::serve(config).await
}
