mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "anchornet", version, about = "Anchor registry and reactor tooling")]
struct Cli {
    /// Print registry and reactor tracing to stderr
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve addresses to anchors and show which ones share an identity
    Resolve {
        /// Addresses to resolve, in order
        #[arg(required = true)]
        addresses: Vec<String>,
        /// Resolve every address relative to this base first
        #[arg(long, value_name = "URL")]
        base: Option<String>,
    },
    /// Build a link graph, run deletions and print what is left as JSON
    Graph {
        /// Edge to add (repeatable)
        #[arg(long = "link", value_name = "SRC=DEST")]
        links: Vec<String>,
        /// Relation type recorded on every added edge
        #[arg(long = "type", value_name = "TYPE")]
        link_type: Option<String>,
        /// Method recorded on every added edge
        #[arg(long, default_value = "GET")]
        method: String,
        /// Attach a placeholder document, protecting the anchor from deletion
        #[arg(long = "loaded", value_name = "ADDR")]
        loaded: Vec<String>,
        /// Delete the anchor for this address (repeatable)
        #[arg(long = "delete", value_name = "ADDR")]
        delete: Vec<String>,
        /// Clear the whole registry before printing
        #[arg(long)]
        delete_all: bool,
    },
    /// Echo stdin line by line through the reactor's console channel
    Watch {
        /// Idle timeout in milliseconds
        #[arg(long, value_name = "N")]
        timeout_ms: Option<u64>,
        /// Fire the timeout even with no partial line pending
        #[arg(long)]
        always: bool,
        /// Poll the console on its own instead of folding it into the wait
        #[arg(long)]
        polled_console: bool,
    },
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.trace {
        anchornet::trace::set_enabled(true);
    }

    match cli.command {
        Command::Resolve { addresses, base } => {
            commands::cmd_resolve(&addresses, base.as_deref())
        }
        Command::Graph {
            links,
            link_type,
            method,
            loaded,
            delete,
            delete_all,
        } => commands::cmd_graph(&commands::GraphPlan {
            links: &links,
            link_type: link_type.as_deref(),
            method: &method,
            loaded: &loaded,
            delete: &delete,
            delete_all,
        }),
        Command::Watch {
            timeout_ms,
            always,
            polled_console,
        } => commands::cmd_watch(timeout_ms, always, polled_console),
    }
}
