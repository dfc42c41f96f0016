pub mod cli;
pub mod config;
pub mod consumer;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use config::{ ConsumerConfig, RelayConfig };
use log::info;
use relay::RelayHandler;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

pub async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args)?;

    info!("--- Relay Configuration ---");
    info!("Server Address: {}", config.server_addr);
    info!("Route: {}", config.route);
    info!("Upstream URL: {}", config.upstream_url);
    info!("Model: {}", config.model);
    info!("Persona: {}", args.persona_path.as_deref().unwrap_or("built-in"));
    info!("Credential Configured: {}", config.has_credential());
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("---------------------------");

    let relay = Arc::new(RelayHandler::from_config(config)?);
    Server::new(relay).run().await
}

pub async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ConsumerConfig::from_args(&args)?;
    info!("Relay URL: {}", config.relay_url);
    consumer::terminal::run_chat(config).await
}
