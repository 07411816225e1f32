pub mod cli;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;

use cli::Args;
use config::SystemPreamble;
use llm::chat::BoxError;
use log::info;
use server::Server;

pub async fn run(args: Args) -> Result<(), BoxError> {
    let client = llm::chat::new_client(&args.llm_config())?;

    let preamble = match &args.preamble_path {
        Some(path) => SystemPreamble::load(path)?,
        None => SystemPreamble::default(),
    };

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", client.get_model());
    if let Some(base_url) = client.get_base_url() {
        info!("Chat Base URL: {}", base_url);
    }
    info!("Max Tokens: {}", args.chat_max_tokens);
    info!("Preamble Source: {}", args.preamble_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    let server = Server::new(args.server_addr.clone(), client, preamble);
    server.run().await
}
