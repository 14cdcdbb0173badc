use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "odin")]
#[command(author, version, about = "Inspect and encode ODIN message files")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a .odin file and print it as JSON
    Inspect {
        /// Path to the .odin file
        file: PathBuf,

        /// Treat the file as a message batch
        #[arg(short, long)]
        batch: bool,
    },

    /// Validate a JSON message (or batch) and write its .odin encoding
    Encode {
        /// JSON input file
        input: PathBuf,

        /// Output .odin file
        output: PathBuf,

        /// Treat the input as a message batch
        #[arg(short, long)]
        batch: bool,
    },
}
