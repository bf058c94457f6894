use clap::Parser;
use decree_cli::{cli::Cli, execute, logging::configure_logging};

fn main() {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);
    std::process::exit(execute(cli));
}
