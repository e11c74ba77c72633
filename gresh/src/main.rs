//! # Gresh CLI Entry Point
//!
//! The main executable for the Gresh shell. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Sets up logging and parses command-line arguments using [`cli::Cli`].
//! 2. **Selection**: Loads the definition and asks for a package and a service via `gresh_core::prepare`.
//! 3. **Binding**: Binds a lazily connected client for the chosen service to the address.
//! 4. **Session**: Prints the banner and runs the interactive loop until the user leaves.
mod chooser;
mod cli;
mod eval;
mod formatter;
mod repl;

use chooser::TerminalChooser;
use clap::Parser;
use cli::Cli;
use formatter::FormattedString;
use gresh_core::session::{self, SessionOptions};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Cli::parse();

    let mut chooser = TerminalChooser::new(args.package, args.service);
    let selection = match gresh_core::prepare(
        &args.proto_file,
        &args.directory,
        &args.address,
        &mut chooser,
    ) {
        Ok(selection) => selection,
        Err(err) => exit_with(err),
    };
    drop(chooser);

    let prompt = session::prompt(&selection.service_name, &args.address);
    let (console, reader) = match repl::spawn_reader(prompt).await {
        Ok(started) => started,
        Err(err) => exit_with(err),
    };

    let options = SessionOptions {
        insecure: args.insecure,
        headers: args.headers,
    };

    let session = match session::bind(
        &selection.service_name,
        selection.service,
        &args.address,
        &options,
        console.clone(),
    ) {
        Ok(session) => session,
        Err(err) => exit_with(err),
    };

    console.print(&session.usage());

    repl::run(&session, reader).await;
}

/// Logs go to stderr so they never mix with replies. Quiet unless `RUST_LOG` says otherwise.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gresh=warn,gresh_core=warn")),
        )
        .init();
}

fn exit_with(err: impl Into<FormattedString>) -> ! {
    eprintln!("{}", err.into());
    process::exit(1);
}
