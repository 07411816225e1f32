use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use std::io::{BufRead, Write};
use std::sync::Arc;
use support_relay::client::{ChatPanel, HttpRelay};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal front-end for the support chat relay")]
struct Args {
    /// Relay endpoint to send conversations to.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:4000/api/chat")]
    relay_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let panel = ChatPanel::new(Arc::new(HttpRelay::new(args.relay_url)));

    let greeting = panel
        .snapshot()
        .await
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    println!("agent> {}", greeting);
    println!("(type a message, or 'exit' to quit)");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        print!("agent> ");
        stdout.flush()?;
        panel
            .send_message_with(line, |delta| {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();
    }

    Ok(())
}
