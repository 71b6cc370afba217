//! CLI entry point for spatial motif mining

use clap::Parser;
use spatialmotif::io::cli::{Cli, QueryProcessor};
use spatialmotif::io::logging;

fn main() -> spatialmotif::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);
    let mut processor = QueryProcessor::new(cli);
    processor.process()
}
