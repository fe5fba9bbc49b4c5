use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use cdrom_builder::pipeline::config::load_cd_config;
use cdrom_builder::{CreateCdStep, Step, StepAction, StepState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn usage() -> &'static str {
    "Usage:\n  create-cd [--config <cd.toml>] [--label <label>] [--output <image.iso>] [FILE...]"
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    label: Option<String>,
    output: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value\n{}", flag, usage()))
        };
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--label" => args.label = Some(value("--label")?),
            "--output" => args.output = Some(PathBuf::from(value("--output")?)),
            "-h" | "--help" => bail!(usage()),
            flag if flag.starts_with("--") => bail!("unknown option '{}'\n{}", flag, usage()),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cdrom_builder=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw)?;

    let (mut files, mut label, mut output) = (Vec::new(), None, None);
    if let Some(config_path) = &args.config {
        let config = load_cd_config(config_path)
            .with_context(|| format!("loading '{}'", config_path.display()))?;
        files = config.files;
        label = config.label;
        output = config.output;
    }
    files.extend(args.files);
    let label = args.label.or(label);
    let output = args.output.or(output);

    let keep_image = output.is_some();
    let mut step = CreateCdStep::new(files);
    if let Some(label) = label {
        step = step.label(label);
    }
    if let Some(output) = output {
        step = step.output(output);
    }

    let mut state = StepState::new();
    match step.run(&mut state) {
        StepAction::Continue => {
            let cd_path = state
                .cd_path()
                .context("step continued without publishing a CD path")?
                .to_path_buf();
            println!("{}", cd_path.display());
            if !keep_image {
                tracing::info!("image is in the temp directory; remove it when done");
            }
            step.cleanup_staging();
            Ok(())
        }
        StepAction::Halt => {
            let err = state.take_error();
            step.cleanup(&mut state);
            match err {
                Some(e) => Err(e).context("creating CD image"),
                None => bail!("creating CD image halted without an error"),
            }
        }
    }
}
