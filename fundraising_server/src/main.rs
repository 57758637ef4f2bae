use dotenvy::dotenv;
use fundraising_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};
use log::info;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();

    info!("🚀️ Starting fundraising server with database {}", config.database_url);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
