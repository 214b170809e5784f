#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use log::{info, warn};

use svgrammar_render::config::RenderConfig;
use svgrammar_render::element::RenderedElement;
use svgrammar_render::graph::{AttributedGraph, RawGraph};
use svgrammar_render::{output, scene};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Renders an attributed graph into a vector drawing.
    Render {
        /// Path to the JSON-encoded attributed graph.
        graph: PathBuf,
        /// Output path; defaults to the graph path with a `.svg` extension.
        out: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory to write a timestamped diagnostic scene dump into.
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
    /// Loads, evaluates and materialises a graph without writing output.
    Check {
        graph: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_or_readline() -> anyhow::Result<Cli> {
    // Args were provided (try to parse, exit on fail)
    if std::env::args_os().len() > 1 {
        return Ok(Cli::parse());
    }

    let mut cmd = Cli::command().no_binary_name(true);

    println!("No CLI arguments were provided");
    println!("Specify arguments via stdin:");
    println!("{}", cmd.render_long_help());

    std::io::stdout().flush().context("could not write to stdout")?;
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).context("could not read stdin")?;

    let args = shlex::split(buffer.trim()).context("invalid quoting")?;
    let matches = cmd.try_get_matches_from(args).context("failed to parse args")?;

    Cli::from_arg_matches(&matches).context("failed to parse args")
}

fn load_graph(path: &PathBuf) -> anyhow::Result<AttributedGraph> {
    info!(target: "svgrammar_render::main", "loading attributed graph from {}", path.display());
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(RawGraph::from_json(&text)?.into_graph()?)
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RenderConfig> {
    match path {
        Some(p) => RenderConfig::load(p).with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn dump_element(w: &mut impl Write, element: &RenderedElement, depth: usize) -> std::io::Result<()> {
    writeln!(
        w,
        "{}{:?} bbox={:?} offset={:?} attrs={:?}",
        "  ".repeat(depth),
        element.kind,
        element.bbox,
        element.offset,
        element.attrs
    )?;
    for child in &element.children {
        dump_element(w, child, depth + 1)?;
    }
    Ok(())
}

fn write_debug_dump(debug_dir: &std::path::Path, run_timestamp: &str, rendered: &RenderedElement) -> anyhow::Result<()> {
    std::fs::create_dir_all(debug_dir)
        .with_context(|| format!("failed to create debug dir {}", debug_dir.display()))?;
    let path = debug_dir.join(format!("{run_timestamp}_scene.log"));
    info!(target: "svgrammar_render::main", "writing diagnostic scene dump to {}", path.display());
    let mut file = std::fs::File::create(&path)?;
    dump_element(&mut file, rendered, 0)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let run_timestamp = chrono::Utc::now().format(r"%y%m%d_%H%M%S").to_string();

    let args = parse_or_readline()?;

    match args.cmd {
        Command::Render { graph, out, config, debug_dir } => {
            let g = load_graph(&graph)?;
            let render_config = load_config(config.as_ref())?;
            let rendered = scene::render_scene(&g, &render_config)?;

            if let Some(dir) = &debug_dir {
                write_debug_dump(dir, &run_timestamp, &rendered.root)?;
            }

            let out_path = out.unwrap_or_else(|| graph.with_extension("svg"));
            output::save(&out_path, &rendered.root, rendered.view_box)
                .with_context(|| format!("failed to save {}", out_path.display()))?;
            info!(target: "svgrammar_render::main", "wrote {}", out_path.display());
        }
        Command::Check { graph, config } => {
            let g = load_graph(&graph)?;
            let render_config = load_config(config.as_ref())?;
            match scene::render_scene(&g, &render_config) {
                Ok(rendered) => {
                    let count = count_elements(&rendered.root);
                    info!(target: "svgrammar_render::main", "graph OK: {count} elements materialised, no fatal errors");
                }
                Err(err) => {
                    warn!(target: "svgrammar_render::main", "graph failed to render: {err}");
                    bail!("graph failed to render: {err}");
                }
            }
        }
    }

    Ok(())
}

fn count_elements(element: &RenderedElement) -> usize {
    1 + element.children.iter().map(count_elements).sum::<usize>()
}
