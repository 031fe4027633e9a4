//! Metrics collected while the CLI runs an analysis.
//!
//! The recorder is process-wide, so this file holds a single test and runs as
//! its own binary.

use clap::Parser;
use std::sync::Arc;
use terraslope_cli::{install_metrics_recorder, App, Cli, CliError, Command, TerraslopeConfig};
use terraslope_dem::{ElevationSource, FetchConfig, MemoryTileSource, TileBuffer, TileFetcher};
use terraslope_metrics::metric_defs;

const SQUARE: &str = "[[35.37,138.72],[35.37,138.725],[35.365,138.725],[35.365,138.72],[35.37,138.72]]";

fn app_over(source: MemoryTileSource) -> App {
    let sources: Vec<Arc<dyn ElevationSource>> = vec![Arc::new(source)];
    let fetch = FetchConfig {
        sources: Vec::new(),
        ..FetchConfig::default()
    };
    let fetcher = TileFetcher::new(fetch, sources).expect("Failed to create fetcher");
    App::with_fetcher(TerraslopeConfig::default(), Arc::new(fetcher))
}

#[test]
fn test_metrics_flag_collects_analysis_series() {
    let cli = Cli::try_parse_from(["terraslope", "analyze", SQUARE, "--metrics", "-s", "50"]).unwrap();
    assert!(cli.metrics);
    let Command::Analyze(args) = &cli.command else {
        panic!("Expected analyze, got {:?}", cli.command);
    };

    let recorder = install_metrics_recorder().expect("Failed to install recorder");
    assert!(matches!(install_metrics_recorder(), Err(CliError::Metrics(_))));
    assert!(recorder.description(metric_defs::ANALYSES.name).is_some());

    let flat = MemoryTileSource::from_fn("flat", |_, size| {
        Some(TileBuffer::from_elevations(size, |_, _| Some(640.0)))
    });
    let analysis = app_over(flat).analyze(args).unwrap();

    // An area no source covers ends up as negative cache entries
    let empty = app_over(MemoryTileSource::new("empty"));
    assert_eq!(empty.elevation(35.36, 138.72).unwrap(), None);

    let bad = app_over(MemoryTileSource::new("unused"));
    let mut zero_spacing = args.clone();
    zero_spacing.spacing = 0.0;
    assert!(bad.analyze(&zero_spacing).is_err());

    let snapshot = recorder.snapshot();
    assert!(snapshot.counters["terraslope.tiles.fetched{source=flat}"] >= 1);
    assert!(snapshot.counters["terraslope.cache.negative_entries"] >= 1);
    assert_eq!(snapshot.counters["terraslope.analysis.requests{outcome=ok}"], 1);
    assert_eq!(snapshot.counters["terraslope.analysis.requests{outcome=validation}"], 1);

    let grid = snapshot.histograms[metric_defs::GRID_POINTS.name];
    assert_eq!(grid.count, 1);
    assert_eq!(grid.max, analysis.point_count as f64);

    let summary = snapshot.to_string();
    assert!(summary.contains("counter   terraslope.tiles.fetched{source=flat}"));
}
