//! Pack command implementation
//!
//! Packs a single atlas source directory, or every atlas directory inside an
//! `anims_src` container. One atlas failing does not stop the others.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use walkdir::WalkDir;

use animpack_atlas::{
    build_atlas, finish_atlas, normalize_path, PackReport, PackRequest, PackStatus,
};

/// Default source path.
pub const DEFAULT_SOURCE_DIR: &str = "anims_src";

/// A source path with this final component holds one atlas per subdirectory.
pub const CONTAINER_DIR_NAME: &str = "anims_src";

/// Result of packing a single atlas directory
#[derive(Debug, Clone, Serialize)]
pub struct AtlasOutcome {
    /// Atlas name
    pub name: String,
    /// Atlas source directory
    pub source_dir: String,
    /// Whether the atlas was packed (written or unchanged)
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Build report if packed
    pub report: Option<PackReport>,
    /// Pack time in milliseconds
    pub duration_ms: u64,
}

impl AtlasOutcome {
    fn status(&self) -> Option<PackStatus> {
        self.report.as_ref().map(|r| r.status)
    }
}

/// Summary of a pack run
#[derive(Debug, Clone, Serialize)]
pub struct PackSummary {
    /// Resolved source path
    pub source: String,
    /// Output directory
    pub out_dir: String,
    /// Atlas directories processed
    pub total_atlases: usize,
    /// Atlases whose outputs were written
    pub written: usize,
    /// Atlases skipped because their hash matched
    pub unchanged: usize,
    /// Atlases that failed
    pub failed: usize,
    /// Total runtime in seconds
    pub runtime_seconds: f64,
    /// Per-atlas results, in processing order
    pub atlases: Vec<AtlasOutcome>,
}

impl PackSummary {
    fn new(source: &Path, out_dir: &Path, atlases: Vec<AtlasOutcome>, runtime_seconds: f64) -> Self {
        let count = |status| atlases.iter().filter(|a| a.status() == Some(status)).count();
        Self {
            source: source.display().to_string(),
            out_dir: out_dir.display().to_string(),
            total_atlases: atlases.len(),
            written: count(PackStatus::Written),
            unchanged: count(PackStatus::Unchanged),
            failed: atlases.iter().filter(|a| !a.success).count(),
            runtime_seconds,
            atlases,
        }
    }
}

/// Run the pack command
///
/// # Arguments
/// * `path` - Atlas source directory, or an `anims_src` container
/// * `out_dir` - Directory receiving the atlas files
/// * `verbose` - Print per-animation and per-file detail
/// * `json` - Print a JSON summary instead of colored output
///
/// # Returns
/// Exit code: 0 success, 1 if any atlas failed
pub fn run(path: &str, out_dir: &str, verbose: bool, json: bool) -> Result<ExitCode> {
    let start = Instant::now();

    let source = absolute(Path::new(path))?;
    if !source.is_dir() {
        anyhow::bail!("Source directory does not exist: {}", source.display());
    }
    let out_path = PathBuf::from(out_dir);
    let atlas_dirs = resolve_atlas_dirs(&source)?;

    if !json {
        println!("{}", "======================================".cyan());
        println!("{}", "  animpack Atlas Packer".cyan());
        println!("{}", "======================================".cyan());
        println!();
        println!("{} {}", "Source:".blue().bold(), source.display());
        println!("{} {}", "Output directory:".blue().bold(), out_path.display());
        println!();
        println!(
            "{} Found {} atlas director{}",
            "INFO".blue().bold(),
            atlas_dirs.len(),
            if atlas_dirs.len() == 1 { "y" } else { "ies" }
        );
        println!();
    }

    let outcomes = pack_all(&atlas_dirs, &out_path, verbose, !json);
    let summary = PackSummary::new(&source, &out_path, outcomes, start.elapsed().as_secs_f64());

    if json {
        let text = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", text);
    } else {
        print_summary(&summary);
    }

    if summary.failed > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Absolute, lexically normalized form of `path`.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(normalize_path(&cwd.join(path)))
}

/// Atlas directories for a source path.
///
/// An `anims_src` container yields its subdirectories sorted by name; any
/// other path is a single atlas.
pub fn resolve_atlas_dirs(source: &Path) -> Result<Vec<PathBuf>> {
    let is_container = source
        .file_name()
        .is_some_and(|name| name == CONTAINER_DIR_NAME);
    if !is_container {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", source.display()))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Pack every atlas directory, isolating failures.
pub fn pack_all(atlas_dirs: &[PathBuf], out_dir: &Path, verbose: bool, print: bool) -> Vec<AtlasOutcome> {
    atlas_dirs
        .iter()
        .map(|dir| pack_one(dir, out_dir, verbose, print))
        .collect()
}

fn pack_one(dir: &Path, out_dir: &Path, verbose: bool, print: bool) -> AtlasOutcome {
    let start = Instant::now();
    let request = PackRequest::new(dir, out_dir);

    if print {
        println!("{} Packing '{}'...", "INFO".blue().bold(), request.name);
    }

    let result = pack_steps(&request, verbose && print, print);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(report) => {
            if print {
                let tag = match report.status {
                    PackStatus::Written => "WRITTEN".green(),
                    PackStatus::Unchanged => "UNCHANGED".yellow(),
                };
                println!("  {} {} ({}ms)", tag, request.name, duration_ms);
                if verbose {
                    for file in &report.files {
                        println!("    {}", file.display().to_string().dimmed());
                    }
                }
            }
            AtlasOutcome {
                name: request.name,
                source_dir: dir.display().to_string(),
                success: true,
                error: None,
                report: Some(report),
                duration_ms,
            }
        }
        Err(e) => {
            let message = format!("{:#}", e);
            if print {
                println!("  {} {} - {}", "FAILED".red(), request.name, message);
            }
            AtlasOutcome {
                name: request.name,
                source_dir: dir.display().to_string(),
                success: false,
                error: Some(message),
                report: None,
                duration_ms,
            }
        }
    }
}

fn pack_steps(request: &PackRequest, verbose: bool, print: bool) -> Result<PackReport> {
    let build = build_atlas(request)
        .with_context(|| format!("Failed to build atlas '{}'", request.name))?;

    if print {
        let grid = build.layout.grid;
        let (width, height) = build.layout.image_dims;
        println!(
            "  {} animations, {} frames, grid {}x{}, image {}x{}{}",
            build.placed.animations.len(),
            build.placed.total_frames(),
            grid.columns,
            grid.rows,
            width,
            height,
            if build.palette.is_some() { ", palettized" } else { "" }
        );
    }
    if verbose {
        for path in &build.frame_paths {
            println!("    Loaded {}", path.display().to_string().dimmed());
        }
        for anim in &build.placed.animations {
            let indices: Vec<String> = anim.frames.iter().map(|i| i.to_string()).collect();
            println!("    {} [{}]", anim.name, indices.join(" ").dimmed());
        }
        println!("    hash {}", build.hash.dimmed());
    }
    if print {
        println!("  Checking hash...");
    }

    finish_atlas(request, &build)
        .with_context(|| format!("Failed to write atlas '{}'", request.name))
}

fn print_summary(summary: &PackSummary) {
    println!();
    println!("{}", "======================================".cyan());
    println!("{}", "  Pack Summary".cyan());
    println!("{}", "======================================".cyan());
    println!();
    println!(
        "{} {}",
        "Atlases processed:".blue().bold(),
        summary.total_atlases
    );
    println!("{} {}", "Written:".green().bold(), summary.written);
    println!("{} {}", "Unchanged:".yellow().bold(), summary.unchanged);
    println!("{} {}", "Failed:".red().bold(), summary.failed);
    println!(
        "{} {:.2}s",
        "Total runtime:".blue().bold(),
        summary.runtime_seconds
    );
    println!();

    let failed: Vec<_> = summary.atlases.iter().filter(|a| !a.success).collect();
    if !failed.is_empty() {
        println!("{}", "Failed atlases:".red().bold());
        for outcome in failed {
            println!(
                "  - {}: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
    }
}
