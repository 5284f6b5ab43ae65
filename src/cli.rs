// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Enums: Types that can be one of several variants
// - Derive macros: Automatically generate code for our types
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::DEFAULT_WORKERS;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "vcloud-resolver",
    version = "0.1.0",
    about = "Resolve obfuscated vcloud.zip redirect chains embedded in JSON documents",
    long_about = "vcloud-resolver walks a JSON document, finds every vcloud.zip link, drives each one \
                  through its multi-hop redirect chain, and writes the document back with the links \
                  replaced by their final tokens. Progress is checkpointed after every link, so an \
                  interrupted run resumes where it left off."
)]
pub struct Cli {
    // The #[command(subcommand)] attribute tells clap that this field
    // will hold one of the subcommands defined in the Commands enum
    #[command(subcommand)]
    pub command: Commands,
}

// This enum defines our subcommands (batch, single)
//
// Each variant represents a different subcommand the user can run
// The fields inside each variant become the arguments for that subcommand
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every vcloud.zip link in a JSON document, with resume support
    ///
    /// Example: vcloud-resolver batch catalog.json --workers 20
    Batch {
        /// Path to the JSON document to process
        ///
        /// This is a positional argument (required, no flag needed)
        input: PathBuf,

        /// Worker-pool width: how many links resolve concurrently
        ///
        /// #[arg(long, default_value_t = ...)] creates --workers with a default
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },

    /// Resolve one link, printing every protocol step (debugging aid)
    ///
    /// Example: vcloud-resolver single https://vcloud.zip/abc123
    Single {
        /// The vcloud.zip link to resolve
        url: String,
    },
}
