//! animpack CLI - Sprite animation atlas packer
//!
//! Packs directories of animation frames into texture atlases with
//! accompanying metadata files.

use clap::Parser;
use std::process::ExitCode;

use animpack_atlas::DEFAULT_OUTPUT_DIR;
use animpack_cli::commands;
use animpack_cli::commands::pack::DEFAULT_SOURCE_DIR;

/// animpack - Sprite Animation Atlas Packer
#[derive(Parser)]
#[command(name = "animpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Atlas source directory, or an `anims_src` directory of atlases
    #[arg(default_value = DEFAULT_SOURCE_DIR)]
    path: String,

    /// Output directory for atlas, palette and metadata files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    out_dir: String,

    /// Show per-frame, per-animation and per-file detail
    #[arg(short, long)]
    verbose: bool,

    /// Output a machine-readable JSON summary (no colored output)
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = commands::pack::run(&cli.path, &cli.out_dir, cli.verbose, cli.json);

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["animpack"]).unwrap();
        assert_eq!(cli.path, "anims_src");
        assert_eq!(cli.out_dir, "anims");
        assert!(!cli.verbose);
        assert!(!cli.json);
    }

    #[test]
    fn test_explicit_path_and_flags() {
        let cli = Cli::try_parse_from([
            "animpack",
            "art/anims_src/Hero",
            "--out-dir",
            "build/anims",
            "--verbose",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.path, "art/anims_src/Hero");
        assert_eq!(cli.out_dir, "build/anims");
        assert!(cli.verbose);
        assert!(cli.json);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["animpack", "-o", "out", "-v"]).unwrap();
        assert_eq!(cli.out_dir, "out");
        assert!(cli.verbose);
    }

    #[test]
    fn test_rejects_extra_positional() {
        assert!(Cli::try_parse_from(["animpack", "a", "b"]).is_err());
    }
}
