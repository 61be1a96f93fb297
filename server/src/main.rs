use clap::Parser;
use log::*;

mod echo_server;

use echo_server::EchoServer;

#[derive(Parser, Debug)]
#[command(name = "xchannel-server", about = "Mock xchannel peer that echoes every message")]
struct Cli {
    #[arg(long, env = "XCHANNEL_BIND", default_value = "127.0.0.1:4000")]
    bind: String,

    /// Exit after serving this many connections.
    #[arg(long)]
    max_connections: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let server = match EchoServer::bind(&cli.bind) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", cli.bind, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run(cli.max_connections) {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
    info!("Server finished");
}
