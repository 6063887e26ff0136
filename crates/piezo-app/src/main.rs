use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{filter::LevelFilter, fmt};
use uuid::Uuid;

use piezo_app::cli::{Cli, Commands, CompressArgs, EngineArgs};
use piezo_app::config::{self, AppConfig};
use piezo_app::error::AppError;
use piezo_app::options::{QualityPreset, ShrinkOptions};
use piezo_app::services::{JobStage, WorkerEvent, WorkerHandle, WorkerRequest};
use piezo_engine::{Engine, Ghostscript};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_level = determine_log_level(&cli);
    init_tracing(log_level);

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn determine_log_level(cli: &Cli) -> LevelFilter {
    match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(level: LevelFilter) {
    let subscriber = fmt().with_max_level(level).with_target(false).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Compress(args)) => run_compress(args).await,
        Some(Commands::Engine(args)) => run_engine_probe(args),
        None => {
            Cli::print_help();
            Ok(())
        }
    }
}

fn resolve_engine(cfg: &AppConfig, explicit: Option<&Path>) -> Result<Ghostscript, AppError> {
    let override_path = explicit.or(cfg.engine.binary.as_deref());
    Ok(Ghostscript::locate(override_path)?)
}

fn run_engine_probe(args: EngineArgs) -> Result<(), AppError> {
    let cfg = config::load()?;
    let engine = resolve_engine(&cfg, args.binary.as_deref())?;
    println!("{}", engine.describe());
    Ok(())
}

async fn run_compress(args: CompressArgs) -> Result<(), AppError> {
    let cfg = config::load()?;
    let engine = resolve_engine(&cfg, None)?;
    tracing::info!(engine = %engine.describe(), "engine resolved");
    let options = build_options(&cfg, &args);

    let mut handle = WorkerHandle::spawn(engine);

    let total = args.inputs.len();
    let mut failed = 0usize;
    for input_path in &args.inputs {
        match compress_one(&mut handle, input_path, args.out_dir.as_deref(), options.clone()).await
        {
            Ok(()) => {}
            // A dead worker cannot serve the remaining files.
            Err(err @ (AppError::WorkerStopped | AppError::Bridge(_))) => return Err(err),
            Err(err) => {
                eprintln!("{err}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        Err(AppError::PartialFailure {
            failed,
            total,
        })
    } else {
        Ok(())
    }
}

/// Submit one file and pump its event stream to completion.
async fn compress_one(
    handle: &mut WorkerHandle,
    input: &Path,
    out_dir: Option<&Path>,
    options: ShrinkOptions,
) -> Result<(), AppError> {
    let bytes = fs::read(input).map_err(|source| AppError::ReadInput {
        path: input.to_path_buf(),
        source,
    })?;
    let input_len = bytes.len() as u64;
    let output_path = output_path_for(input, out_dir);

    let job_id = Uuid::new_v4();
    handle
        .submit(WorkerRequest::Compress {
            job_id,
            pdf_buffer: bytes,
            options,
        })
        .await?;

    let mut bar: Option<ProgressBar> = None;
    loop {
        let Some(event) = handle.next_event().await else {
            return Err(AppError::WorkerStopped);
        };
        if event.job_id() != job_id {
            // Stale or mismatched correlation id.
            continue;
        }

        match event {
            WorkerEvent::Status { stage, message, .. } => {
                tracing::debug!(%job_id, ?stage, message = message.as_deref().unwrap_or(""), "status");
                if stage == JobStage::Running {
                    bar = Some(page_progress_bar(input));
                }
            }
            WorkerEvent::Progress {
                percent,
                current,
                total,
                ..
            } => {
                if let Some(bar) = &bar {
                    // The core may legitimately lower a percentage when the
                    // page total is revised; the display never goes back.
                    bar.set_position(bar.position().max(u64::from(percent)));
                    match total {
                        Some(total) => bar.set_message(format!("page {current}/{total}")),
                        None if current > 0 => bar.set_message(format!("page {current}")),
                        None => {}
                    }
                }
            }
            WorkerEvent::Result {
                out_buffer,
                used_original,
                pdf_version_used,
                ..
            } => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                fs::write(&output_path, &out_buffer).map_err(|source| AppError::WriteOutput {
                    path: output_path.clone(),
                    source,
                })?;
                report_result(
                    input,
                    &output_path,
                    input_len,
                    out_buffer.len() as u64,
                    used_original,
                    &pdf_version_used,
                );
                return Ok(());
            }
            WorkerEvent::Error { error, .. } => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                return Err(AppError::JobFailed {
                    path: input.to_path_buf(),
                    message: error,
                });
            }
        }
    }
}

fn build_options(cfg: &AppConfig, args: &CompressArgs) -> ShrinkOptions {
    let preset = match args.preset {
        Some(preset) => preset,
        None => cfg
            .compress
            .preset
            .parse::<QualityPreset>()
            .unwrap_or_else(|_| {
                tracing::warn!(preset = %cfg.compress.preset, "unknown preset in config; using default");
                QualityPreset::default()
            }),
    };

    ShrinkOptions::builder()
        .grayscale(args.grayscale || cfg.compress.grayscale)
        .resolution_dpi(args.resolution.unwrap_or(cfg.compress.resolution_dpi))
        .downsample_threshold(args.threshold.unwrap_or(cfg.compress.downsample_threshold))
        .preset(preset)
        .build()
        .sanitized()
}

fn output_path_for(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let suffixed = || {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        input.with_file_name(format!("{stem}.shrunk.pdf"))
    };

    match out_dir {
        Some(dir) => {
            let candidate = dir.join(input.file_name().unwrap_or_default());
            // Never clobber the input when the output dir is the input's own.
            if candidate == input { suffixed() } else { candidate }
        }
        None => suffixed(),
    }
}

fn page_progress_bar(input: &Path) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{prefix:<24} [{bar:40}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(input.display().to_string());
    bar
}

fn report_result(
    input: &Path,
    output: &Path,
    input_len: u64,
    output_len: u64,
    used_original: bool,
    pdf_version: &str,
) {
    let note = if used_original {
        "kept original; engine output was larger".to_string()
    } else if input_len > 0 {
        let saved = input_len.saturating_sub(output_len);
        format!("saved {:.1}%", saved as f64 / input_len as f64 * 100.0)
    } else {
        "empty input".to_string()
    };
    println!(
        "{} -> {}: {} -> {} ({note}, pdf {pdf_version})",
        input.display(),
        output.display(),
        human_bytes(input_len),
        human_bytes(output_len),
    );
}

fn human_bytes(len: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = len as f64;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    if unit == "B" {
        format!("{len} {unit}")
    } else {
        format!("{value:.1} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_a_suffixed_sibling() {
        let path = output_path_for(Path::new("/docs/report.pdf"), None);
        assert_eq!(path, Path::new("/docs/report.shrunk.pdf"));
    }

    #[test]
    fn out_dir_keeps_the_file_name() {
        let path = output_path_for(Path::new("/docs/report.pdf"), Some(Path::new("/tmp/out")));
        assert_eq!(path, Path::new("/tmp/out/report.pdf"));
    }

    #[test]
    fn out_dir_matching_the_input_falls_back_to_the_suffix() {
        let path = output_path_for(Path::new("/docs/report.pdf"), Some(Path::new("/docs")));
        assert_eq!(path, Path::new("/docs/report.shrunk.pdf"));
    }

    #[test]
    fn cli_flags_override_config_defaults() {
        let cfg = AppConfig::default();
        let args = CompressArgs {
            inputs: vec![PathBuf::from("a.pdf")],
            out_dir: None,
            preset: Some(QualityPreset::Prepress),
            resolution: Some(300.0),
            threshold: None,
            grayscale: true,
        };
        let options = build_options(&cfg, &args);
        assert_eq!(options.preset, QualityPreset::Prepress);
        assert_eq!(options.resolution_dpi, 300.0);
        assert_eq!(options.downsample_threshold, 1.5);
        assert!(options.grayscale);
    }

    #[test]
    fn unknown_config_preset_degrades_to_the_default() {
        let mut cfg = AppConfig::default();
        cfg.compress.preset = "ultra".to_string();
        let args = CompressArgs {
            inputs: vec![PathBuf::from("a.pdf")],
            out_dir: None,
            preset: None,
            resolution: None,
            threshold: None,
            grayscale: false,
        };
        assert_eq!(build_options(&cfg, &args).preset, QualityPreset::Ebook);
    }

    #[test]
    fn human_bytes_picks_sensible_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
