use family_tree::{Config, app};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env_and_args(&args)?;

    // Start the web application
    app::run(config).await?;

    Ok(())
}
