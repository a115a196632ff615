use std::sync::Arc;

use wrapsrv::server::signal::shutdown_signal;
use wrapsrv::{Envelope, Request, Route, Server, ServerConfig};

/// Configuration file looked up when none is given (any extension `config` reads)
const DEFAULT_CONFIG: &str = "wrapsrv";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = ServerConfig::load_from(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::from_config(cfg)?;
    server.add_route(Route::get("help", "/help", help));
    let server = Arc::new(server);

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            eprintln!("[SIGNAL] Cannot register signal handlers: {e}");
            return;
        }
        if let Err(e) = stopper.stop().await {
            eprintln!("[ERROR] {e}");
        }
    });

    server.start().await?;
    Ok(())
}

async fn help(_request: Request) -> Envelope {
    Envelope::ok().with_details("This is a help message")
}
