use clap::Parser;
use scenematch::image::io::load_color_image;
use scenematch::{
    to_grayscale, ColorImage, ColorView, ExactConfig, FeatureConfig, FindConfig, Finder,
    MatchKind, MatchResult, OrbConfig, OrbDetector, OwnedImage, RansacConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SceneMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExactConfigJson {
    threshold: f32,
    max_count: usize,
    use_min_score: bool,
    parallel: bool,
}

impl Default for ExactConfigJson {
    fn default() -> Self {
        let cfg = ExactConfig::default();
        Self {
            threshold: cfg.threshold,
            max_count: cfg.max_count,
            use_min_score: cfg.use_min_score,
            parallel: cfg.parallel,
        }
    }
}

impl From<&ExactConfigJson> for ExactConfig {
    fn from(value: &ExactConfigJson) -> Self {
        Self {
            threshold: value.threshold,
            max_count: value.max_count,
            use_min_score: value.use_min_score,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureConfigJson {
    ratio: f32,
    min_match: usize,
    reproj_threshold: f64,
    max_iters: usize,
    confidence: f64,
    seed: u64,
}

impl Default for FeatureConfigJson {
    fn default() -> Self {
        let cfg = FeatureConfig::default();
        Self {
            ratio: cfg.ratio,
            min_match: cfg.min_match,
            reproj_threshold: cfg.homography.reproj_threshold,
            max_iters: cfg.homography.max_iters,
            confidence: cfg.homography.confidence,
            seed: cfg.homography.seed,
        }
    }
}

impl From<&FeatureConfigJson> for FeatureConfig {
    fn from(value: &FeatureConfigJson) -> Self {
        Self {
            ratio: value.ratio,
            min_match: value.min_match,
            homography: RansacConfig {
                reproj_threshold: value.reproj_threshold,
                max_iters: value.max_iters,
                confidence: value.confidence,
                seed: value.seed,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OrbConfigJson {
    fast_threshold: u8,
    max_keypoints: usize,
    levels: usize,
}

impl Default for OrbConfigJson {
    fn default() -> Self {
        let cfg = OrbConfig::default();
        Self {
            fast_threshold: cfg.fast_threshold,
            max_keypoints: cfg.max_keypoints,
            levels: cfg.levels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    scene_path: String,
    pattern_paths: Vec<String>,
    output_path: Option<String>,
    feature_fallback: bool,
    exact: ExactConfigJson,
    features: FeatureConfigJson,
    orb: OrbConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene_path: String::new(),
            pattern_paths: Vec::new(),
            output_path: None,
            feature_fallback: FindConfig::default().feature_fallback,
            exact: ExactConfigJson::default(),
            features: FeatureConfigJson::default(),
            orb: OrbConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    kind: &'static str,
    center: [i32; 2],
    top_left: [i32; 2],
    /// Top-left, bottom-left, bottom-right, top-right.
    quad: Option<[[i32; 2]; 4]>,
    size: [usize; 2],
    scores: Vec<f32>,
}

impl From<&MatchResult> for MatchRecord {
    fn from(value: &MatchResult) -> Self {
        let kind = match value.kind {
            MatchKind::Exact { .. } => "exact",
            MatchKind::SingleFeature { .. } => "single_feature",
            MatchKind::Homography { .. } => "homography",
        };
        Self {
            kind,
            center: [value.center.x, value.center.y],
            top_left: [value.top_left.x, value.top_left.y],
            quad: value.quad.map(|q| q.polygon().map(|p| [p.x, p.y])),
            size: [value.size.width, value.size.height],
            scores: value.scores(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PatternOutput {
    pattern_path: String,
    matches: Vec<MatchRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    scene_path: String,
    results: Vec<PatternOutput>,
}

/// Owned pixels for one input; grayscale when channel layouts disagree.
enum Loaded {
    Color(ColorImage),
    Gray(OwnedImage),
}

impl Loaded {
    fn view(&self) -> ColorView<'_> {
        match self {
            Loaded::Color(img) => img.view(),
            Loaded::Gray(img) => ColorView::from(img),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("scenematch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.scene_path.is_empty() || config.pattern_paths.is_empty() {
        return Err("scene_path and pattern_paths must be set in the config".into());
    }

    let scene = load_color_image(&config.scene_path)?;
    let patterns = config
        .pattern_paths
        .iter()
        .map(load_color_image)
        .collect::<Result<Vec<_>, _>>()?;

    let same_layout = patterns
        .iter()
        .all(|p| p.view().channels() == scene.view().channels());
    let (scene, patterns): (Loaded, Vec<Loaded>) = if same_layout {
        (
            Loaded::Color(scene),
            patterns.into_iter().map(Loaded::Color).collect(),
        )
    } else {
        tracing::warn!("channel layouts differ; matching in grayscale");
        (
            Loaded::Gray(to_grayscale(scene.view())),
            patterns
                .iter()
                .map(|p| Loaded::Gray(to_grayscale(p.view())))
                .collect(),
        )
    };

    let detector = OrbDetector::new(OrbConfig {
        fast_threshold: config.orb.fast_threshold,
        max_keypoints: config.orb.max_keypoints,
        levels: config.orb.levels,
        ..OrbConfig::default()
    });
    let finder = Finder::with_detector(detector).with_config(FindConfig {
        exact: (&config.exact).into(),
        features: (&config.features).into(),
        feature_fallback: config.feature_fallback,
    });

    let views: Vec<ColorView<'_>> = patterns.iter().map(Loaded::view).collect();
    let found = finder.find_multi(scene.view(), &views)?;
    tracing::info!(patterns = views.len(), "search finished");

    let output = Output {
        scene_path: config.scene_path.clone(),
        results: config
            .pattern_paths
            .iter()
            .zip(&found)
            .map(|(path, matches)| PatternOutput {
                pattern_path: path.clone(),
                matches: matches.iter().map(MatchRecord::from).collect(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
