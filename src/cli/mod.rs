// CLI module for marginalia
// Author: kelexine (https://github.com/kelexine)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// marginalia - ask a language model about a passage of text
#[derive(Parser, Debug)]
#[command(name = "marginalia", version, about, long_about = None)]
pub struct Args {
    /// Configuration file (default: ~/.marginalia/config.toml)
    #[arg(long, global = true, env = "MARGINALIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print collected metrics after the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a task on a passage, optionally followed by questions
    Ask {
        /// Task name, as listed by `tasks`
        #[arg(long, short, default_value = "Explain")]
        task: String,

        /// Follow-up question, asked after the task answer (repeatable)
        #[arg(long = "follow-up", short = 'f')]
        follow_ups: Vec<String>,

        /// The selected passage
        text: String,
    },

    /// List the configured tasks
    Tasks,

    /// List known models
    Models {
        /// Fetch the catalog from the API first
        #[arg(long)]
        refresh: bool,
    },

    /// Store the API key
    SetKey {
        key: String,
    },

    /// Select the model used for queries
    SetModel {
        id: String,
    },

    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the number of cached answers
    Stats,
    /// Delete every cached answer
    Clear,
}
