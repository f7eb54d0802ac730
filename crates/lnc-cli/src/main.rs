// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LEDGER NODE CONSOLE - Command Line Interface for ledger node operators
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::{Parser, Subcommand};
use colored::*;
use lnc_network::SyncController;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "lnc")]
#[command(about = "Ledger Node Console - inspect, mine and keep a set of ledger nodes in sync", long_about = None)]
#[command(version)]
struct Cli {
    /// Active node URL (reads LNC_NODE_URL env var, else the config file,
    /// else http://localhost:5000)
    #[arg(short, long, env = "LNC_NODE_URL")]
    node: Option<String>,

    /// Additional known node, announced to the active node (repeatable)
    #[arg(short, long = "peer")]
    peers: Vec<String>,

    /// Config directory (default: ~/.lnc)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show node id, chain length and the latest block
    Chain,

    /// Print the active node's id
    Id,

    /// Mine a block on the active node
    Mine,

    /// Transaction operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// Known nodes, registration and conflict resolution
    Nodes {
        #[command(subcommand)]
        action: NodesCommands,
    },

    /// Interactive session with background peer refresh
    Console,

    /// Console configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Submit a transaction to the active node
    Send {
        /// Sender identifier
        #[arg(short, long)]
        sender: String,

        /// Recipient identifier
        #[arg(short, long)]
        recipient: String,

        /// Amount (positive number)
        #[arg(short, long)]
        amount: String,
    },
}

#[derive(Subcommand)]
enum NodesCommands {
    /// Refresh from the active node and list every known node
    List,

    /// Register a node with the active node
    Add {
        /// Node URL, e.g. http://127.0.0.1:5001
        url: String,
    },

    /// Make another node active and announce the known nodes to it
    Switch {
        /// Node URL
        url: String,
    },

    /// Ask the active node to adopt the longest chain among its peers
    Resolve,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a config file with the current settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let cli = Cli::parse();

    // Print banner
    print_banner();

    // Get config directory
    let config_dir = cli.config_dir.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".lnc")
    });

    let config = commands::load_config(&config_dir, cli.node.as_deref(), &cli.peers)?;

    if let Commands::Config { action } = cli.command {
        return commands::config::handle(action, &config, &config_dir);
    }

    let controller = lnc_network::controller_from_config(&config)?;
    log::debug!("active node {}", controller.get_active_endpoint().address);

    let result = run(cli.command, &controller).await;
    controller.shutdown();
    result
}

async fn run(
    command: Commands,
    controller: &SyncController,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Chain => commands::chain::show_chain(controller).await,
        Commands::Id => commands::chain::show_id(controller).await,
        Commands::Mine => commands::chain::mine(controller).await,
        Commands::Tx { action } => commands::tx::handle(action, controller).await,
        Commands::Nodes { action } => commands::nodes::handle(action, controller).await,
        Commands::Console => commands::console::run(controller).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn print_banner() {
    println!(
        "{}",
        "╔═══════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║        LEDGER NODE CONSOLE (LNC) v0.3         ║"
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "║     Inspect | Mine | Keep nodes in sync       ║".cyan()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════╝".cyan()
    );
    println!();
}

fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

// ─────────────────────────────────────────────────────────────────
// UNIT TESTS
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    // ── CLI Argument Parsing ────────────────────────────────────

    #[test]
    fn test_cli_chain() {
        let cli = Cli::try_parse_from(["lnc", "chain"]);
        assert!(cli.is_ok(), "Failed to parse: {:?}", cli.err());
        assert!(matches!(cli.unwrap().command, Commands::Chain));
    }

    #[test]
    fn test_cli_mine_and_id() {
        assert!(matches!(
            Cli::try_parse_from(["lnc", "mine"]).unwrap().command,
            Commands::Mine
        ));
        assert!(matches!(
            Cli::try_parse_from(["lnc", "id"]).unwrap().command,
            Commands::Id
        ));
    }

    #[test]
    fn test_cli_tx_send() {
        let cli = Cli::try_parse_from([
            "lnc", "tx", "send", "--sender", "alice", "--recipient", "bob", "--amount", "2.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Tx {
                action:
                    TxCommands::Send {
                        sender,
                        recipient,
                        amount,
                    },
            } => {
                assert_eq!(sender, "alice");
                assert_eq!(recipient, "bob");
                assert_eq!(amount, "2.5");
            }
            _ => panic!("Expected Tx::Send"),
        }
    }

    #[test]
    fn test_cli_tx_send_short_flags() {
        let cli =
            Cli::try_parse_from(["lnc", "tx", "send", "-s", "a", "-r", "b", "-a", "1"]).unwrap();
        assert!(matches!(cli.command, Commands::Tx { .. }));
    }

    #[test]
    fn test_cli_nodes_switch() {
        let cli = Cli::try_parse_from(["lnc", "nodes", "switch", "http://127.0.0.1:5001"]).unwrap();
        match cli.command {
            Commands::Nodes {
                action: NodesCommands::Switch { url },
            } => assert_eq!(url, "http://127.0.0.1:5001"),
            _ => panic!("Expected Nodes::Switch"),
        }
    }

    #[test]
    fn test_cli_nodes_list_add_resolve() {
        assert!(matches!(
            Cli::try_parse_from(["lnc", "nodes", "list"]).unwrap().command,
            Commands::Nodes {
                action: NodesCommands::List
            }
        ));
        assert!(matches!(
            Cli::try_parse_from(["lnc", "nodes", "add", "http://b:5000"])
                .unwrap()
                .command,
            Commands::Nodes {
                action: NodesCommands::Add { .. }
            }
        ));
        assert!(matches!(
            Cli::try_parse_from(["lnc", "nodes", "resolve"]).unwrap().command,
            Commands::Nodes {
                action: NodesCommands::Resolve
            }
        ));
    }

    #[test]
    fn test_cli_global_node_and_peers() {
        let cli = Cli::try_parse_from([
            "lnc",
            "--node",
            "http://10.0.0.1:5000",
            "-p",
            "http://10.0.0.2:5000",
            "--peer",
            "http://10.0.0.3:5000",
            "console",
        ])
        .unwrap();
        assert_eq!(cli.node.as_deref(), Some("http://10.0.0.1:5000"));
        assert_eq!(cli.peers.len(), 2);
        assert!(matches!(cli.command, Commands::Console));
    }

    #[test]
    fn test_cli_config_init_force() {
        let cli = Cli::try_parse_from(["lnc", "-c", "/tmp/lnc", "config", "init", "--force"])
            .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/lnc")));
        match cli.command {
            Commands::Config {
                action: ConfigCommands::Init { force },
            } => assert!(force),
            _ => panic!("Expected Config::Init"),
        }
    }

    #[test]
    fn test_cli_missing_required_args() {
        // tx send without --recipient should fail
        let result = Cli::try_parse_from(["lnc", "tx", "send", "--sender", "a", "--amount", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_unknown_subcommand() {
        let result = Cli::try_parse_from(["lnc", "foobar"]);
        assert!(result.is_err());
    }
}
