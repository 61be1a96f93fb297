use clap::Parser;
use log::*;

mod chat_client;

use chat_client::ChatClient;

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: &str = "4000";

#[derive(Parser, Debug)]
#[command(name = "xchannel-client", about = "Interactive xchannel session client")]
struct Cli {
    /// Display name shown next to every message this client sends.
    #[arg(long, env = "XCHANNEL_IDENTITY", default_value = "guest")]
    identity: String,

    #[arg(long, env = "XCHANNEL_ADDRESS", default_value = DEFAULT_SERVER_ADDRESS)]
    address: String,

    #[arg(long, env = "XCHANNEL_PORT", default_value = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Connect timeout in seconds; blocks indefinitely when omitted.
    #[arg(long)]
    connect_timeout: Option<u64>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    info!("Connecting to server at {}:{}...", cli.address, cli.port);
    let connected = ChatClient::connect(
        &cli.identity,
        &cli.address,
        cli.port,
        cli.connect_timeout,
    );
    let client = match connected {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Connected as '{}'", client.identity());

    if let Err(e) = client.run(std::io::stdin().lock()) {
        error!("Console error: {}", e);
    }
    info!("Client finished");
}
