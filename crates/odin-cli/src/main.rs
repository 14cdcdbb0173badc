use clap::Parser;
use odin_cli::cli::{Cli, Commands};
use odin_cli::commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect { file, batch } => {
            println!("{}", commands::inspect(&file, batch)?);
        }
        Commands::Encode {
            input,
            output,
            batch,
        } => {
            let count = commands::encode(&input, &output, batch)?;
            println!("Encoded {} message(s) into {}", count, output.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "odin_cli=debug,odin_core=debug"
    } else {
        "odin_cli=warn,odin_core=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
