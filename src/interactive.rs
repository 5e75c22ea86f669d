use crate::config::{Config, ModelProfile};
use crate::pipeline::{OverwritePrompt, WorkItem};
use crate::video::SourceRef;
use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "m4v"];

pub struct InteractiveResult {
    pub work: WorkItem,
    pub config: Config,
}

pub fn run_interactive_wizard(mut config: Config) -> anyhow::Result<InteractiveResult> {
    print_header();

    // Step 1: Source video
    let source = select_source()?;

    // Step 2: Output folder
    let working_dir = select_output_dir(&config, &source)?;

    // Step 3: Transcription model
    let model = select_model(config.default_model)?;

    // Step 4: Lyric correction
    let manual_correction = Confirm::new()
        .with_prompt("Review and correct the lyrics before the video is rendered?")
        .default(false)
        .interact()?;

    print_summary(&source, &working_dir, model, manual_correction);

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    if model != config.default_model
        && Confirm::new()
            .with_prompt(format!("Use '{}' as the default model from now on?", model))
            .default(false)
            .interact()?
    {
        config.default_model = model;
        save_config(&config)?;
        println!("{} Default model saved to config", style("✓").green());
    }

    println!();

    let work = WorkItem::new(source, working_dir)
        .with_model(model)
        .with_offset_ms(config.offset_ms)
        .with_manual_correction(manual_correction);

    Ok(InteractiveResult { work, config })
}

/// Asks on the terminal before an existing output video is replaced.
pub struct ConsolePrompt;

#[async_trait]
impl OverwritePrompt for ConsolePrompt {
    async fn confirm_overwrite(&self, path: &Path) -> bool {
        let prompt = format!("{} already exists. Overwrite?", path.display());
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║          karaoke - Karaoke Video Generator        ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn save_config(config: &Config) -> anyhow::Result<()> {
    if let Some(config_path) = Config::config_file_path() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_content = toml::to_string_pretty(config)?;
        fs::write(config_path, toml_content)?;
    }
    Ok(())
}

fn select_source() -> anyhow::Result<SourceRef> {
    println!("{}", style("Select source video:").bold());

    let files = scan_media_files(".")?;

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter a video URL or path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a video")
        .items(&items)
        .default(0)
        .interact()?;

    if selection < files.len() {
        return Ok(SourceRef::Local(files[selection].clone()));
    }

    let entered: String = Input::new()
        .with_prompt("Video URL or file path")
        .interact_text()?;
    let source = SourceRef::parse(&entered);
    if let SourceRef::Local(path) = &source {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }
    Ok(source)
}

fn select_output_dir(config: &Config, source: &SourceRef) -> anyhow::Result<PathBuf> {
    let default = default_output_dir(config, source);

    let dir: String = Input::new()
        .with_prompt("Output folder")
        .default(default.display().to_string())
        .interact_text()?;

    Ok(PathBuf::from(dir.trim()))
}

/// Appended to the name of the folder a single video gets to itself.
const WORK_DIR_SUFFIX: &str = "_karaoke";

/// Longest folder name taken from a remote locator.
const MAX_SLUG_LEN: usize = 48;

/// A folder owned by this video alone: `<base>/<name>_karaoke`.
///
/// `base` is the configured output folder, else the folder holding a local
/// source, else the current directory.
pub fn default_output_dir(config: &Config, source: &SourceRef) -> PathBuf {
    let (parent, name) = match source {
        SourceRef::Local(path) => {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());
            (parent, name)
        }
        SourceRef::Remote(url) => (PathBuf::from("."), locator_slug(url)),
    };

    let base = config.output_dir.clone().unwrap_or(parent);
    base.join(format!("{}{}", name, WORK_DIR_SUFFIX))
}

/// File-name-safe form of a URL: alphanumeric runs joined by `_`.
fn locator_slug(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);

    let mut slug = String::new();
    for c in rest.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "download".to_string()
    } else {
        slug.to_string()
    }
}

fn select_model(current: ModelProfile) -> anyhow::Result<ModelProfile> {
    let items: Vec<String> = ModelProfile::ALL
        .iter()
        .map(|m| model_description(*m))
        .collect();
    let default = ModelProfile::ALL
        .iter()
        .position(|m| *m == current)
        .unwrap_or(ModelProfile::ALL.len() - 1);

    let selection = Select::new()
        .with_prompt("Select transcription model")
        .items(&items)
        .default(default)
        .interact()?;

    Ok(ModelProfile::ALL[selection])
}

fn model_description(model: ModelProfile) -> String {
    let note = match model {
        ModelProfile::Tiny => "fastest, least accurate",
        ModelProfile::Base => "fast",
        ModelProfile::Small => "balanced",
        ModelProfile::Medium => "accurate",
        ModelProfile::LargeV3 => "most accurate, slowest",
    };
    format!("{} - {}", model, note)
}

pub fn scan_media_files(dir: impl AsRef<Path>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                    files.push(path);
                }
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn print_summary(source: &SourceRef, working_dir: &Path, model: ModelProfile, edit: bool) {
    println!("\n{}", style("═══ Summary ═══").bold());
    println!("  Source:     {}", style(source).cyan());
    println!(
        "  Output:     {}",
        style(working_dir.join("output.mp4").display()).cyan()
    );
    println!("  Model:      {}", model);
    println!("  Correction: {}", if edit { "yes" } else { "no" });
    println!();
}
