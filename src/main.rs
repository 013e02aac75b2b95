use anyhow::Result;

use statusboard::app::App;
use statusboard::config::{self, Config};
use statusboard::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging BEFORE any tracing calls
    logging::init_logging()?;

    let config = Config::load()?;
    tracing::info!(
        "Loaded settings (config file: {})",
        config::config_file_path().display()
    );

    // Run the application
    let app = App::new(config).await?;
    app.run().await
}
