//! opendec — compile OpenDec speech markup into an engine instruction stream.

use anyhow::{bail, Context};
use clap::Parser;
use opendec::config::CompilerConfig;
use opendec::dsl::{Compiler, FileSink, Source, State};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "opendec", version)]
#[command(about = "Compile OpenDec speech markup into engine instructions", long_about = None)]
struct Cli {
    /// Source files or inline OpenDec text (default: discover sources)
    sources: Vec<String>,

    /// Additional include directory for imports and played files
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Directory for compiled files
    #[arg(short = 'o', long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Write compiled output to stdout instead of the build directory
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: ./opendec.yaml, then ~/.opendec/config.yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::load_from(path)
            .with_context(|| format!("Reading config {}", path.display()))?,
        None => CompilerConfig::load().unwrap_or_default(),
    };

    for dir in &cli.include {
        if !dir.is_dir() {
            bail!("include directory '{}' does not exist", dir.display());
        }
    }
    config.include_dirs.extend(cli.include.iter().cloned());
    if let Some(dir) = cli.build_dir {
        config.build_dir = dir;
    }

    let sources = if cli.sources.is_empty() {
        discover(&config.extension)?
    } else {
        collect_sources(&cli.sources, &config.extension)?
    };
    if sources.is_empty() {
        warn!("no sources to compile");
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        let name = match &source.path {
            Some(path) => path.display().to_string(),
            None => format!("inline source #{}", i + 1),
        };
        let mut state = State::new(config.include_dirs.clone());

        if cli.stdout {
            let mut out = String::new();
            Compiler::compile_source(source, &mut state, &mut out)
                .with_context(|| format!("Compiling {name}"))?;
            write_stream(&mut io::stdout().lock(), &out).context("Writing to stdout")?;
            continue;
        }

        std::fs::create_dir_all(&config.build_dir).with_context(|| {
            format!("Creating build directory {}", config.build_dir.display())
        })?;
        let target = match &source.path {
            Some(path) => config.compiled_path(path),
            None => config
                .build_dir
                .join(format!("inline-{}.opendec.compiled", i + 1)),
        };

        let mut sink = FileSink::create(&target)
            .with_context(|| format!("Creating {}", target.display()))?;
        Compiler::compile_source(source, &mut state, &mut sink)
            .with_context(|| format!("Compiling {name}"))?;
        sink.finish()
            .with_context(|| format!("Writing {}", target.display()))?;
        info!("compiled {name} -> {}", target.display());
    }
    Ok(())
}

/// Write the instruction stream exactly as compiled.
fn write_stream(writer: &mut impl Write, out: &str) -> io::Result<()> {
    writer.write_all(out.as_bytes())?;
    writer.flush()
}

/// Treat each argument as a file if one exists, otherwise as source text.
fn collect_sources(args: &[String], extension: &str) -> anyhow::Result<Vec<Source>> {
    let suffix = format!(".{extension}");
    let mut sources = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.is_file() {
            let source =
                Source::from_file(path).with_context(|| format!("Reading {}", path.display()))?;
            sources.push(source);
        } else if arg.ends_with(&suffix) && !arg.contains(char::is_whitespace) {
            warn!("skipping missing source file '{arg}'");
        } else {
            sources.push(Source::from_text(arg.as_str()));
        }
    }
    Ok(sources)
}

/// Every `*.<extension>` file in the working directory and `./src`.
fn discover(extension: &str) -> anyhow::Result<Vec<Source>> {
    let mut paths = Vec::new();
    for dir in [PathBuf::from("."), PathBuf::from("src")] {
        if !dir.is_dir() {
            continue;
        }
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("Listing {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == extension) {
                paths.push(path);
            }
        }
    }
    paths.sort();
    info!("discovered {} source file(s)", paths.len());

    paths
        .iter()
        .map(|p| Source::from_file(p).with_context(|| format!("Reading {}", p.display())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_is_written_byte_exact() {
        let mut buf = Vec::new();
        write_stream(&mut buf, "[aa][_<500>]").unwrap();
        assert_eq!(buf, b"[aa][_<500>]");
    }

    #[test]
    fn empty_stream_writes_nothing() {
        let mut buf = Vec::new();
        write_stream(&mut buf, "").unwrap();
        assert!(buf.is_empty());
    }
}
