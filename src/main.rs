// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Dispatch to the appropriate subcommand handler
// 3. Print the final summary
// 4. Exit with proper code (0 = success, 1 = unresolved links / bad input,
//    2 = unexpected error)
//
// Rust concepts used:
// - async/await: Because link resolution is many concurrent network requests
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;      // src/cli.rs - command-line parsing
mod codec;    // src/codec.rs - base64 and percent decoding of payloads
mod document; // src/document.rs - finding/rewriting links in the JSON tree
mod engine;   // src/engine/ - parallel batch runs with checkpointing
mod resolver; // src/resolver/ - the link resolution pipeline

// Import items we need from our modules
use clap::Parser; // Parser trait enables the parse() method
use cli::{Cli, Commands};
use std::path::Path;
use std::time::Duration;

// anyhow::Result is like std::result::Result but simpler for applications
// It lets us return any error type with the ? operator
use anyhow::Result;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Run our application logic and capture the exit code
    // std::process::exit() terminates the program with the given code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(0) = everything resolved
//   Ok(1) = unresolved links remain, or the input file is missing
//   Err = unexpected error
async fn run() -> Result<i32> {
    // Parse command-line arguments into our Cli struct
    // This will automatically handle --help, --version, etc.
    let cli = Cli::parse();

    // Match on which subcommand was used
    match cli.command {
        Commands::Batch { input, workers } => handle_batch(&input, workers).await,
        Commands::Single { url } => handle_single(&url).await,
    }
}

// Handles the 'batch' subcommand
//
// Parameters:
//   input: path to the JSON document
//   workers: worker-pool width
async fn handle_batch(input: &Path, workers: usize) -> Result<i32> {
    // A missing input file is a user mistake, not an internal error:
    // say so plainly and exit nonzero without a backtrace
    if !input.exists() {
        eprintln!("Input file does not exist: {}", input.display());
        return Ok(1);
    }

    println!("🔗 Resolving links in {} with {} worker(s)", input.display(), workers);

    let summary = engine::run_batch(input, workers).await?;

    // Final summary
    println!();
    println!("📊 Summary:");
    println!("   ✅ Resolved: {}", summary.resolved);
    println!("   ❌ Failed this run: {}", summary.failed_this_run);
    println!("   📋 Total links: {}", summary.total_links);
    println!("   💾 Output: {}", summary.output_file.display());
    println!("   🔖 Checkpoint: {}", summary.progress_file.display());

    // Unresolved links will be retried on the next invocation; signal them
    // in the exit code so scripts can tell "done" from "run me again"
    if summary.resolved < summary.total_links {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'single' subcommand
//
// Resolves one link end-to-end with every protocol step printed. This is
// the debugging companion to batch mode: same pipeline, shorter inter-phase
// delay, verbose output, no checkpointing.
async fn handle_single(url: &str) -> Result<i32> {
    println!("🔗 Resolving: {}", url);

    let token = resolver::resolve(url, Duration::from_secs(3), true).await?;

    println!();
    println!("=== RESULT ===");
    println!("{}", token);
    Ok(0)
}
