mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chaptersplit_core::{format_duration, plan_segments, run_with_progress, Config, ProgressEvent};
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;

use crate::cli::build_cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let output_dir = matches
        .get_one::<PathBuf>("output")
        .expect("defaulted argument");
    let bitrate = matches
        .get_one::<String>("bitrate")
        .expect("defaulted argument");
    let ffmpeg = matches
        .get_one::<PathBuf>("ffmpeg")
        .expect("defaulted argument");
    let archive = matches.get_flag("archive");
    let overwrite = matches.get_flag("overwrite");
    let dry_run = matches.get_flag("dry-run");

    let mut builder = Config::builder(input_path, output_dir)
        .bitrate(bitrate.as_str())
        .ffmpeg(ffmpeg)
        .archive(archive)
        .overwrite(overwrite);
    if let Some(overrides) = matches.get_many::<(u32, String)>("title") {
        for (number, title) in overrides {
            builder = builder.title_override(*number, title.as_str());
        }
    }

    let config = builder.build().with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            input_path.display()
        )
    })?;
    debug!("{config:?}");

    if dry_run {
        let plan = plan_segments(&config)
            .with_context(|| format!("failed to read chapters from '{}'", input_path.display()))?;

        if config.archive {
            let archive_path = config.archive_path()?;
            println!(
                "Dry run: would write {} chapter(s) to {}:",
                plan.len(),
                archive_path.display()
            );
            for request in &plan {
                println!(
                    "  {}  [{} +{}]",
                    request.file_name(),
                    request.start(),
                    format_duration(request.duration_ms)
                );
            }
        } else {
            println!("Dry run: would generate {} chapter file(s):", plan.len());
            for request in &plan {
                println!(
                    "  {}  [{} +{}]",
                    config.output_dir.join(request.file_name()).display(),
                    request.start(),
                    format_duration(request.duration_ms)
                );
            }
        }

        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_draw_target(ProgressDrawTarget::stderr());

    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let progress_handle = progress.clone();
    let result = run_with_progress(config, move |event: ProgressEvent| match event {
        ProgressEvent::Start { total } => {
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(total as u64);
            progress_handle.enable_steady_tick(Duration::from_millis(100));
            progress_handle.set_message("converting");
        }
        ProgressEvent::Advance {
            completed,
            number,
            title,
            size,
            ..
        } => {
            progress_handle.set_position(completed as u64);
            progress_handle.set_message(format!(
                "{number:02} {title} ({})",
                HumanBytes(size)
            ));
        }
        ProgressEvent::Finish => {
            progress_handle.set_message("Completed");
        }
    })
    .with_context(|| format!("failed to split '{}'", input_path.display()));

    progress.finish_and_clear();

    let summary = result?;
    println!(
        "Converted {} chapter(s), {} total.",
        summary.chapters,
        HumanBytes(summary.bytes)
    );
    for path in &summary.outputs {
        println!("  {}", path.display());
    }
    for section in summary.skipped {
        eprintln!("warning: {}", section.into_error());
    }

    Ok(())
}
