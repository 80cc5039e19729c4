use anyhow::{Context, Result};
use pinchbox::cli::ServerArgs;
use pinchbox::menu_server::{self, MenuDatabase};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = ServerArgs::parse_from_env()?;
    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;

    menu_server::serve(listener, MenuDatabase::new(args.root)).await
}
