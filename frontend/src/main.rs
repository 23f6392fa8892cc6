use std::env;
use std::path::Path;

use dotenvy::dotenv;
use ecom_ui::config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
    let config = config::load(Path::new("config"), &app_env)?;

    ecom_ui::run(config).await?;
    Ok(())
}
