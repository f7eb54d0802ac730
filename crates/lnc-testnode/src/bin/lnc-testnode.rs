// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC TEST NODE - standalone in-memory ledger node
//
// Usage:
//   lnc-testnode --port 5000
//   lnc-testnode --port 5001 --peer 127.0.0.1:5000
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::Parser;
use lnc_testnode::TestNode;
use std::net::{IpAddr, SocketAddr};

#[derive(Parser)]
#[command(name = "lnc-testnode")]
#[command(about = "In-memory ledger node for trying out the Ledger Node Console", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Peer reported on GET /nodes (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    let node = TestNode::spawn_on(SocketAddr::new(args.bind, args.port)).await?;
    if !args.peers.is_empty() {
        node.set_peers(&args.peers);
    }
    println!("ledger node {} serving {}", node.node_id(), node.url());
    println!("press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    node.stop().await;
    Ok(())
}
