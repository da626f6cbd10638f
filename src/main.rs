use std::{io::BufWriter, process::ExitCode, sync::Arc};

use clap::Parser;
use dupsquash::{
    Config,
    ElasticGateway,
    Input,
    Pipeline,
    cli::Cli,
    error::{self, Error},
    pipeline::Summary,
};
use tokio::{fs::File, io::BufReader};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DUPSQUASH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(shell) = cli.completions {
        Cli::generate_completions(shell);
        return ExitCode::SUCCESS;
    }
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            if e.is_startup() {
                eprintln!("Try 'dupsquash --help' for more information.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> error::Result<Summary> {
    let config = Config::from_cli(cli)?;
    tracing::debug!(?config, "resolved configuration");

    let gateway = Arc::new(ElasticGateway::new(&config.host, config.port));
    let pipeline = Pipeline::new(gateway, config.settings, config.options)?;
    let sink = BufWriter::new(std::io::stdout());

    match &config.input {
        Input::Literal(text) => pipeline.run_literal(text, sink).await,
        Input::File { path, projection } => {
            let file =
                File::open(path).await.map_err(|source| Error::InputAccess {
                    path: path.clone(),
                    source,
                })?;
            pipeline
                .run_rows(BufReader::new(file), projection, sink)
                .await
        }
    }
}
