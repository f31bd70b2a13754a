//! fuse CLI - Merge keyword and vector search results from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use fusion_core::{
    parse_records, CandidateResult, FusedResult, FusionConfig, FusionMethod, HybridConfig,
    NormalizeMethod, Result, Source,
};
use fusion_query::fuse;

/// fuse - Hybrid keyword + vector result fusion
#[derive(Parser)]
#[command(name = "fuse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: user config dir, then ./hybrid-fusion.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse a keyword result file with a vector result file
    Run {
        /// JSON array of keyword hits ({"_id"|"id", "_score"|"score", ...})
        #[arg(short, long)]
        lexical: Option<PathBuf>,

        /// JSON array of vector hits ({"_id"|"id", "distance", ...})
        #[arg(short = 'e', long)]
        vector: Option<PathBuf>,

        /// Query text (logging only)
        #[arg(short, long, default_value = "")]
        query: String,

        #[command(flatten)]
        overrides: Overrides,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Per-run overrides layered on top of the loaded configuration.
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Fusion method
    #[arg(short, long, value_enum)]
    method: Option<MethodArg>,

    /// Semantic weight; keyword weight becomes 1 - this
    #[arg(short = 'w', long)]
    semantic_weight: Option<f64>,

    /// RRF rank-damping constant
    #[arg(long)]
    rrf_k: Option<u32>,

    /// Score normalization for weighted fusion
    #[arg(short, long, value_enum)]
    normalize: Option<NormalizeArg>,

    /// Minimum hybrid score (weighted fusion only)
    #[arg(long)]
    min_score: Option<f64>,

    /// Maximum number of results
    #[arg(short = 'k', long)]
    max_results: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Weighted,
    Rrf,
}

impl From<MethodArg> for FusionMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Weighted => Self::Weighted,
            MethodArg::Rrf => Self::ReciprocalRankFusion,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NormalizeArg {
    Minmax,
    ZscoreSigmoid,
}

impl From<NormalizeArg> for NormalizeMethod {
    fn from(arg: NormalizeArg) -> Self {
        match arg {
            NormalizeArg::Minmax => Self::MinMax,
            NormalizeArg::ZscoreSigmoid => Self::ZScoreSigmoid,
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            lexical,
            vector,
            query,
            overrides,
            json,
        } => {
            let fusion = apply_overrides(&config.fusion, &overrides)?;
            let lexical = read_results(lexical.as_deref(), Source::Keyword)?;
            let vector = read_results(vector.as_deref(), Source::Semantic)?;

            let results = fuse(&query, &lexical, &vector, &fusion);

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_table(&results);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<HybridConfig> {
    match path {
        Some(path) => HybridConfig::load(path),
        None => HybridConfig::load_default(),
    }
}

/// Layer command-line overrides onto `base` and re-validate.
fn apply_overrides(base: &FusionConfig, overrides: &Overrides) -> Result<FusionConfig> {
    let mut builder = base.to_builder();

    if let Some(method) = overrides.method {
        builder = builder.method(method.into());
    }
    if let Some(weight) = overrides.semantic_weight {
        builder = builder.semantic_weight(weight);
    }
    if let Some(k) = overrides.rrf_k {
        builder = builder.rrf_k(k);
    }
    if let Some(normalize) = overrides.normalize {
        builder = builder.normalize_method(normalize.into());
    }
    if let Some(min_score) = overrides.min_score {
        builder = builder.min_score_threshold(min_score);
    }
    if overrides.max_results.is_some() {
        builder = builder.max_results(overrides.max_results);
    }

    builder.build()
}

/// Read a provider result file; a missing path means an empty list.
fn read_results(path: Option<&Path>, source: Source) -> Result<Vec<CandidateResult>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    let content = fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&content)?;
    let results = parse_records(source, document)?;

    debug!("Read {} {} results from {}", results.len(), source, path.display());

    Ok(results)
}

fn print_table(results: &[FusedResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for r in results {
        let mut sources = Vec::new();
        if let Some(rank) = r.keyword_rank {
            sources.push(format!("keyword #{}", rank));
        }
        if let Some(rank) = r.semantic_rank {
            sources.push(format!("semantic #{}", rank));
        }

        println!(
            "{:>3}. {:<24} {:.4}  [{}]",
            r.rank,
            r.id,
            r.hybrid_score,
            sources.join(", ")
        );

        if let Some(subject) = r.attributes.get("subject").and_then(|v| v.as_str()) {
            println!("     {}", subject);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_rebalance_weights() {
        let overrides = Overrides {
            semantic_weight: Some(0.4),
            method: Some(MethodArg::Rrf),
            ..Overrides::default()
        };

        let config = apply_overrides(&FusionConfig::default(), &overrides).unwrap();
        assert_eq!(config.method(), FusionMethod::ReciprocalRankFusion);
        assert!((config.keyword_weight() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = Overrides {
            min_score: Some(2.0),
            ..Overrides::default()
        };
        let err = apply_overrides(&FusionConfig::default(), &overrides).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_read_results_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"_id": "e1", "_score": 15.2, "subject": "Invoice"}}, {{"_id": "e2", "_score": 12.8}}]"#
        )
        .unwrap();

        let results = read_results(Some(file.path()), Source::Keyword).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].raw_score, 15.2);
        assert_eq!(results[0].attributes["subject"], "Invoice");

        assert!(read_results(None, Source::Semantic).unwrap().is_empty());
    }

    #[test]
    fn test_read_results_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hits": []}}"#).unwrap();

        let err = read_results(Some(file.path()), Source::Keyword).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "fuse", "run", "-l", "kw.json", "-e", "vec.json", "-m", "rrf", "-k", "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                lexical, overrides, ..
            } => {
                assert_eq!(lexical.unwrap(), PathBuf::from("kw.json"));
                assert!(matches!(overrides.method, Some(MethodArg::Rrf)));
                assert_eq!(overrides.max_results, Some(5));
            }
            Commands::Config => panic!("expected run"),
        }
    }
}
