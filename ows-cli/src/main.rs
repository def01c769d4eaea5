use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use ows_core::{CompileOptions, Node, ast_to_json, compile_ast, parse};
use simple_logger::SimpleLogger;

/// Compile OWS scripts into workshop rules.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Output file (defaults to the input with a .owc extension)"
    )]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Only write the syntax tree as JSON next to the input")]
    tree: bool,

    #[arg(short, long, help = "Strip whitespace and lowercase the output")]
    minify: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    execute(cli)
}

/// `RUST_LOG` overrides the level chosen on the command line.
fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("failed to initialize logger")
}

fn execute(cli: Cli) -> Result<()> {
    let input = cli.input.display().to_string();
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {input}"))?;

    let stem = strip_source_extension(&cli.input);
    let tree_path = with_suffix(&stem, ".json");
    let output_path = cli.output.unwrap_or_else(|| with_suffix(&stem, ".owc"));

    let ast = parse(&source).with_context(|| format!("failed to parse {input}"))?;
    if cli.tree {
        return write_tree(&tree_path, &ast);
    }
    if let Err(err) = write_tree(&tree_path, &ast) {
        log::warn!("{err:#}");
    }

    let options = CompileOptions { minify: cli.minify };
    let output =
        compile_ast(&ast, &options).with_context(|| format!("failed to compile {input}"))?;
    println!("{output}");
    write_output(&output_path, output.as_bytes())?;
    log::info!("wrote {}", output_path.display());
    Ok(())
}

fn strip_source_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "ows") {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_tree(path: &Path, ast: &Node) -> Result<()> {
    let json = ast_to_json(ast)?;
    write_output(path, json.as_bytes())
        .with_context(|| format!("failed to write syntax tree {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
