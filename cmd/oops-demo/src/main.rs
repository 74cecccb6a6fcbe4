//! oops demo
//!
//! Builds a composed error the way a storage layer might and prints it
//! terse, verbose and as JSON.
//!
//! # Environment Variables
//!
//! - `RUST_LOG=debug` - Show library diagnostics (capturer changes, later faults)
//! - `OOPS_TRACE_DEPTH=N` - Frames kept per trace (default 10)

use oops::{later, shadow, verbose, Error, Namespace, ResultExt};
use tracing::info;

static STORE: Namespace = Namespace::new("store");

fn write_block(id: u32) -> oops::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        format!("block {id}: read-only filesystem"),
    ))
    .trace()
}

fn close_file() -> Option<Error> {
    Some(later(|| Error::msg("close: bad file descriptor")))
}

fn save(id: u32) -> oops::Result<()> {
    let mut err = write_block(id).err();

    // Cleanup failures join the primary error rather than replacing it.
    STORE.chain_into(&mut err, [close_file()]);

    err.map_or(Ok(()), Err)
}

fn handle_request() -> oops::Result<()> {
    match save(7) {
        Ok(()) => Ok(()),
        Err(internal) => {
            let public = STORE.error("request failed, try again later");
            shadow(internal, public).map_or(Ok(()), Err)
        }
    }
}

// RUST_LOG=debug cargo run -p oops-demo
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("=== oops demo ===\n");

    let Err(err) = handle_request() else {
        println!("no error?");
        return;
    };
    info!(type_name = err.type_name(), "request failed");

    println!("--- terse ---");
    println!("{err}\n");

    println!("--- verbose ---");
    println!("{err:#}\n");

    println!("--- hidden, forced verbose ---");
    if let Some(hidden) = err.find::<oops::ShadowError>().map(|s| s.hidden().clone()) {
        if let Some(loud) = verbose(hidden) {
            println!("{loud}\n");
        }
    }

    println!("--- json ---");
    match oops::to_json(&err).and_then(|value| serde_json::to_string_pretty(&value)) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("marshal failed: {e}"),
    }

    println!("\n=== done ===");
}
