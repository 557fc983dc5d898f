use agentops::config::{CliCommand, USAGE, parse_args};
use agentops::server::{ServeError, run_http_server};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let argv = std::env::args().collect::<Vec<_>>();
    let env = |key: &str| std::env::var(key).ok();
    let config = match parse_args(&argv, &env) {
        Ok(CliCommand::Serve(config)) => config,
        Ok(CliCommand::Help) => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{USAGE}");
            return Ok(());
        }
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            let _ = writeln!(err, "{USAGE}");
            std::process::exit(2);
        }
    };

    agentops::logging::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(MainError::Runtime)?;
    runtime.block_on(run_http_server(config))?;
    Ok(())
}
