use crate::config::{Config, load_config};
use crate::ir::{Diagram, parse_diagram};
use crate::layout::compute_layout;
use crate::layout_dump::{print_layout_dump, write_layout_dump};
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "wirelay", version, about = "Orthogonal wiring layout for block diagrams")]
pub struct Args {
    /// Diagram file (JSON or JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout, render and theme settings)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Distance between adjacent lanes, in grid units
    #[arg(long = "lane-spacing")]
    pub lane_spacing: Option<f32>,

    /// Shortest uncrossed span that can carry a label
    #[arg(long = "min-label-span")]
    pub min_label_span: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    let diagram = read_diagram(args.input.as_deref())?;

    let layout = compute_layout(&diagram, &config.layout)?;
    for failure in layout.failures() {
        tracing::warn!(connection = %failure.name, reason = ?failure.reason, "connection left unrouted");
    }

    match args.output_format {
        OutputFormat::Json => match args.output.as_deref() {
            Some(path) => write_layout_dump(path, &layout, &diagram)?,
            None => print_layout_dump(&layout, &diagram)?,
        },
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &diagram, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => write_png(&args, &layout, &diagram, &config)?,
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(spacing) = args.lane_spacing {
        config.layout.lane_spacing = spacing;
    }
    if let Some(span) = args.min_label_span {
        config.layout.min_label_span = span;
    }
    Ok(config)
}

#[cfg(feature = "png")]
fn write_png(
    args: &Args,
    layout: &crate::layout::Layout,
    diagram: &Diagram,
    config: &Config,
) -> Result<()> {
    let output = ensure_output(&args.output, "png")?;
    let svg = render_svg(layout, diagram, &config.theme, &config.render);
    crate::render::write_output_png(&svg, &output, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(
    _args: &Args,
    _layout: &crate::layout::Layout,
    _diagram: &Diagram,
    _config: &Config,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_diagram(path: Option<&Path>) -> Result<Diagram> {
    let content = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    parse_diagram(&content)
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
