// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Stepgraph CLI entrypoint.
//!
//! Reads a workflow YAML file and formats, projects, lays out, analyses or exports it.
//! Logging goes to stderr and is filtered through `STEPGRAPH_LOG` (default `warn`).

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stepgraph::config::EditorConfig;
use stepgraph::format::{export_document, export_file_name, parse_document};
use stepgraph::layout::{apply_layout, layout_graph, LayoutDirection};
use stepgraph::model::{fixtures, WorkflowDocument};
use stepgraph::projection::{project, ProjectedGraph};
use stepgraph::query::analyze;
use stepgraph::store::{write_atomic, WriteDurability};

const LOG_ENV: &str = "STEPGRAPH_LOG";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Editor config file (YAML). Environment overrides still apply.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a workflow file and print its canonical YAML
    Fmt { file: PathBuf },
    /// Print the projected graph of a workflow file
    Project {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Lay out the projected graph and print node positions
    Layout {
        file: PathBuf,
        #[arg(long, value_enum)]
        direction: Option<DirectionArg>,
        /// Use the compact preset
        #[arg(long)]
        compact: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report orphaned steps, broken connections and terminal steps
    Analyze {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write `<flow_id>.yaml` into a directory
    Export {
        file: PathBuf,
        /// Target directory (defaults to the current one)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Sync the written file and its directory
        #[arg(long)]
        durable_writes: bool,
    },
    /// Print the built-in support flow as YAML
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    Tb,
    Lr,
    Bt,
    Rl,
}

impl From<DirectionArg> for LayoutDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Tb => Self::TopToBottom,
            DirectionArg::Lr => Self::LeftToRight,
            DirectionArg::Bt => Self::BottomToTop,
            DirectionArg::Rl => Self::RightToLeft,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_document(path: &Path) -> Result<WorkflowDocument, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let doc = parse_document(&text).map_err(|err| format!("{}: {err}", path.display()))?;
    info!(path = %path.display(), steps = doc.steps().len(), "loaded workflow");
    Ok(doc)
}

fn print_graph(graph: &ProjectedGraph) {
    for node in &graph.nodes {
        let warning = if node.warning { " !" } else { "" };
        println!(
            "{} [{}] level {} at ({}, {}){warning}",
            node.id,
            node.category.as_str(),
            node.level,
            node.position.x,
            node.position.y,
        );
    }
    for edge in &graph.edges {
        match &edge.label {
            Some(label) => println!("{}: {} -> {} ({label})", edge.id, edge.source, edge.target),
            None => println!("{}: {} -> {}", edge.id, edge.source, edge.target),
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = EditorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fmt { file } => {
            let doc = read_document(&file)?;
            print!("{}", export_document(&doc)?);
        }
        Commands::Project { file, json } => {
            let doc = read_document(&file)?;
            let graph = project(&doc, None, &config.projection);
            if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                print_graph(&graph);
            }
        }
        Commands::Layout { file, direction, compact, json } => {
            let doc = read_document(&file)?;
            let mut graph = project(&doc, None, &config.projection);
            let options = config.layout.options(direction.map(Into::into), compact);
            let layout = layout_graph(&graph.nodes, &graph.edges, &options);
            apply_layout(&mut graph.nodes, &layout);
            info!(
                layers = layout.layers().len(),
                reversed_edges = layout.reversed_edges(),
                "layout computed"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&graph.positions())?);
            } else {
                print_graph(&graph);
            }
        }
        Commands::Analyze { file, json } => {
            let doc = read_document(&file)?;
            let analysis = analyze(&doc);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
                return Ok(());
            }
            for step_id in &analysis.orphaned_steps {
                println!("orphaned: {step_id}");
            }
            for broken in &analysis.broken_connections {
                match &broken.closest {
                    Some(closest) => println!(
                        "broken: {} -> {} ({}; closest: {closest})",
                        broken.from, broken.to, broken.reason
                    ),
                    None => {
                        println!("broken: {} -> {} ({})", broken.from, broken.to, broken.reason)
                    }
                }
            }
            for step_id in &analysis.terminal_steps {
                println!("terminal: {step_id}");
            }
            if analysis.is_clean() && analysis.suggestions.is_empty() {
                println!("No problems detected.");
            }
            for suggestion in &analysis.suggestions {
                println!("- {suggestion}");
            }
        }
        Commands::Export { file, out, durable_writes } => {
            let doc = read_document(&file)?;
            let dir = out.unwrap_or_else(|| PathBuf::from("."));
            let target = dir.join(export_file_name(&doc));
            let durability = if durable_writes || config.durable_writes {
                WriteDurability::Durable
            } else {
                WriteDurability::BestEffort
            };
            write_atomic(&target, export_document(&doc)?.as_bytes(), durability)
                .map_err(|err| format!("failed to write {}: {err}", target.display()))?;
            info!(path = %target.display(), "exported workflow");
            println!("{}", target.display());
        }
        Commands::Demo => {
            print!("{}", export_document(&fixtures::support_flow())?);
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
