// src/main.rs

use when_changed::{cli, logging, resolve, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = run_main(args).await {
        if err.is_usage() {
            eprintln!("{}", cli::usage());
        }
        eprintln!("when-changed error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run_main(args: cli::CliArgs) -> when_changed::errors::Result<()> {
    let options = resolve(&args)?;
    logging::init_logging(args.log_level, options.verbosity)?;
    run(options).await?;
    Ok(())
}
