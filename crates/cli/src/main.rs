use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{domains, inbox, new_address, read, watch};

#[derive(Parser)]
#[command(name = "vapormail")]
#[command(about = "Vapormail - disposable mailboxes over an unreliable upstream")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the domains currently usable for new addresses
    Domains,

    /// Generate a fresh random mailbox address
    NewAddress {
        /// Domain for the address; defaults to the first available one
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Print the inbox for an address
    Inbox {
        /// Mailbox address (login@domain)
        address: String,
    },

    /// Print one message from an inbox
    Read {
        /// Mailbox address (login@domain)
        address: String,

        /// Message id as shown by the inbox listing
        id: u64,
    },

    /// Poll an inbox until interrupted, printing listings as they arrive
    Watch {
        /// Mailbox address (login@domain)
        address: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,vapormail_core=info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Domains => domains().await,
        Commands::NewAddress { domain } => new_address(domain).await,
        Commands::Inbox { address } => inbox(&address).await,
        Commands::Read { address, id } => read(&address, id).await,
        Commands::Watch { address } => watch(&address).await,
    }
}
