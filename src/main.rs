use auth_server::{run, Config, NAME, VERSION};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::load()?;
    info!("Starting {} {}", NAME, VERSION);

    run(config).await
}
