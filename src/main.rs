use nalgebra::Vector3;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pose_filter::{ConfigurationManager, PipelineConfig, PoseFilterPipeline, Topology};

/// Recorded estimator output, one array of points per frame
#[derive(Debug, Deserialize)]
struct Recording {
    frames: Vec<Vec<[f64; 3]>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let program = args.first().map_or("pose-filter", |s| s.as_str());
        eprintln!("Usage: {} <config.json|--default> <frames.json>", program);
        return Err("Invalid arguments".into());
    }

    let config = if args[1] == "--default" {
        PipelineConfig::default()
    } else {
        *ConfigurationManager::from_file(&args[1])?.config()
    };

    let recording: Recording = serde_json::from_str(&std::fs::read_to_string(&args[2])?)?;
    let mut pipeline = PoseFilterPipeline::from_config(Topology::vnect()?, &config)?;

    let mut rejected = 0usize;
    for (index, points) in recording.frames.iter().enumerate() {
        let measurements: Vec<Vector3<f64>> = points.iter().map(|p| Vector3::from(*p)).collect();
        match pipeline.process_frame(&measurements) {
            Ok(frame) => println!("{}", serde_json::to_string(&frame)?),
            Err(err) => {
                warn!(frame = index, error = %err, "skipping frame");
                rejected += 1;
            }
        }
    }

    info!(
        frames = recording.frames.len(),
        accepted = pipeline.frames_processed(),
        rejected,
        "replay finished"
    );
    Ok(())
}
