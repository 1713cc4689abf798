use clap::{Parser, ValueEnum};
use imlocate::{
    load_image, FeatureConfig, FeatureMatcher, LocateConfig, Locator, MatchResult, Quad,
    Strategy, TemplateConfig, TemplateMatcher,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Locate a search image inside a source image")]
struct Cli {
    /// Image to search in.
    source: PathBuf,
    /// Image to look for.
    search: PathBuf,
    /// Matching strategy; `auto` picks from the search image keypoint count.
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    strategy: StrategyArg,
    /// Maximum number of matches (0 = all).
    #[arg(long, default_value_t = 0)]
    max_count: usize,
    /// Minimum ZNCC score for template matches.
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,
    /// Correlate R, G and B separately instead of gray.
    #[arg(long)]
    color: bool,
    /// Correlate edge maps instead of raw intensities.
    #[arg(long)]
    remove_background: bool,
    /// Minimum feature and good-match count for feature matching.
    #[arg(long, default_value_t = 10)]
    min_match_count: usize,
    /// Keypoint count at which `auto` switches to feature matching.
    #[arg(long, default_value_t = 20)]
    richness_threshold: usize,
    /// Write JSON here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Auto,
    Template,
    Features,
}

#[derive(Debug, Serialize)]
struct PointRecord {
    x: i32,
    y: i32,
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: i32,
    y: i32,
    score: f32,
    region: Option<Vec<PointRecord>>,
}

impl From<MatchResult> for MatchRecord {
    fn from(value: MatchResult) -> Self {
        Self {
            x: value.center.x,
            y: value.center.y,
            score: value.score,
            region: value.region.as_ref().map(region_points),
        }
    }
}

fn region_points(quad: &Quad) -> Vec<PointRecord> {
    quad.corners()
        .iter()
        .map(|p| PointRecord { x: p.x, y: p.y })
        .collect()
}

#[derive(Debug, Serialize)]
struct Output {
    strategy: &'static str,
    matches: Vec<MatchRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("imlocate=info".parse()?))
            .with_target(false)
            .init();
    }

    let source = load_image(&cli.source)?;
    let search = load_image(&cli.search)?;

    let template_cfg = TemplateConfig::default()
        .with_threshold(cli.threshold)
        .with_color(cli.color)
        .with_remove_background(cli.remove_background);
    let feature_cfg = FeatureConfig::default().with_min_match_count(cli.min_match_count);

    let (strategy, matches) = match cli.strategy {
        StrategyArg::Auto => {
            let config = LocateConfig::default()
                .with_richness_threshold(cli.richness_threshold)
                .with_template(template_cfg)
                .with_features(feature_cfg);
            let located = Locator::new(config).locate_all(&source, &search, cli.max_count)?;
            (located.strategy, located.matches)
        }
        StrategyArg::Template => {
            let matches =
                TemplateMatcher::new(template_cfg).find_all(&source, &search, cli.max_count)?;
            (Strategy::Template, matches)
        }
        StrategyArg::Features => {
            let matches = FeatureMatcher::new(feature_cfg)
                .find_all(&source, &search, cli.max_count)?
                .unwrap_or_default();
            (Strategy::Features, matches)
        }
    };

    let output = Output {
        strategy: strategy.as_str(),
        matches: matches.into_iter().map(MatchRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match cli.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
