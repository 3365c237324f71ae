//! folio - XML manuscript converter

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folio::render::{TexRenderer, ToolchainConfig};
use folio::util::decode_source;
use folio::{Backend, HtmlConfig, LatexConfig, Preamble, convert_html, convert_latex};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Convert XML manuscripts to HTML chapters or LaTeX", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio -i thesis.xml -o html          Write html/chapter01.html, ...
    folio -i thesis.xml -o thesis.tex -l Write a LaTeX document
    folio -o html < thesis.xml           Read the source from stdin")]
struct Cli {
    /// Source document (default: standard input)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output directory (HTML) or file (LaTeX)
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Produce LaTeX instead of HTML
    #[arg(short, long)]
    latex: bool,

    /// Use the minimal LaTeX preamble
    #[arg(long, requires = "latex")]
    minimal: bool,

    /// Keep glyphs as text in rendered images
    #[arg(short = 't', long)]
    keep_text: bool,

    /// Remove the HTML output directory before writing
    #[arg(long)]
    clean: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,

    /// TeX engine used for rasterization
    #[arg(long, value_name = "PROGRAM", default_value = "xelatex")]
    latex_program: String,

    /// PDF to SVG converter used for rasterization
    #[arg(long, value_name = "PROGRAM", default_value = "dvisvgm")]
    svg_program: String,
}

impl Cli {
    fn backend(&self) -> Backend {
        if self.latex {
            Backend::Latex
        } else {
            Backend::Html
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> folio::Result<()> {
    let bytes = read_input(cli.input.as_deref())?;
    let source = decode_source(&bytes);

    let renderer = TexRenderer::new().with_config(ToolchainConfig {
        latex: cli.latex_program.clone(),
        svg_converter: cli.svg_program.clone(),
        keep_text: cli.keep_text,
        ..ToolchainConfig::default()
    });

    match cli.backend() {
        Backend::Html => {
            let config = HtmlConfig {
                output_dir: cli.output.clone(),
                clean: cli.clean,
            };
            let report = convert_html(&source, &config, &renderer)?;
            if !cli.quiet {
                println!(
                    "{} chapter(s) written to {}",
                    report.chapters.len(),
                    cli.output.display()
                );
            }
        }
        Backend::Latex => {
            let image_dir = cli
                .output
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("images");
            let config = LatexConfig {
                preamble: if cli.minimal {
                    Preamble::Minimal
                } else {
                    Preamble::Full
                },
                image_dir,
                ..LatexConfig::default()
            };
            let file = File::create(&cli.output)?;
            convert_latex(&source, BufWriter::new(file), &config, &renderer)?;
            if !cli.quiet {
                println!("Written to {}", cli.output.display());
            }
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> folio::Result<Vec<u8>> {
    match path {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            Ok(bytes)
        }
    }
}
