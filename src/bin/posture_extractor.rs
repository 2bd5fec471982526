use std::path::PathBuf;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use posture_extractor::config::config::PipelineConfig;
use posture_extractor::modules::pose_detector::create_detector;
use posture_extractor::modules::thumbnail_generator::OpenCvThumbnailGenerator;
use posture_extractor::modules::video_reader::OpenCvVideoReader;
use posture_extractor::pipeline::analysis::health_check;
use posture_extractor::pipeline::request::{AnalysisRequest, UserMetadata, VideoUpload};
use posture_extractor::PosturePipeline;

#[derive(Parser, Debug)]
#[command(name = "posture-extractor", version, about = "Posture metrics from multi-view videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse 1-4 videos and print the results as JSON.
    Analyze(AnalyzeArgs),
    /// Print the liveness record.
    Health,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Video file; repeat once per camera angle.
    #[arg(long = "video", required = true)]
    videos: Vec<PathBuf>,

    /// Comma separated angles, one per video (front, left, right, back).
    #[arg(long)]
    angles: String,

    /// Height in centimetres.
    #[arg(long)]
    height: Option<f64>,

    /// Weight in kilograms.
    #[arg(long)]
    weight: Option<f64>,

    #[arg(long)]
    age: Option<u32>,

    /// Camera distance in metres.
    #[arg(long = "camera-distance")]
    camera_distance: Option<f64>,

    /// JSON configuration file; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Health => {
            println!("{}", serde_json::to_string_pretty(&health_check())?);
        }
        Command::Analyze(args) => analyze(args).await?,
    }
    Ok(())
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::new(),
    };

    let mut videos = Vec::with_capacity(args.videos.len());
    for path in &args.videos {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        videos.push(VideoUpload::new(file_name, content));
    }
    let user = UserMetadata {
        height_cm: args.height,
        weight_kg: args.weight,
        age: args.age,
        camera_distance_m: args.camera_distance,
    };
    let request = AnalysisRequest::from_angle_list(videos, &args.angles, user);

    let detector = create_detector(&config.detector)?;
    let thumbnails = OpenCvThumbnailGenerator::new(&config.thumbnail, config.aggregation.confidence_threshold);
    let mut pipeline = PosturePipeline::new(config, detector, Box::new(OpenCvVideoReader), Box::new(thumbnails));

    let batch = pipeline.analyze(request).await?;
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
