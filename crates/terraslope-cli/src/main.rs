use clap::Parser;
use std::io;
use terraslope_cli::{init_logging, install_metrics_recorder, run, Cli};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level.as_deref()) {
        e.exit();
    }
    let recorder = match cli.metrics.then(install_metrics_recorder).transpose() {
        Ok(recorder) => recorder,
        Err(e) => e.exit(),
    };

    let stdout = io::stdout();
    let result = run(&cli, &mut stdout.lock());

    if let Some(recorder) = recorder {
        eprint!("{}", recorder.snapshot());
    }
    if let Err(e) = result {
        e.exit();
    }
}
