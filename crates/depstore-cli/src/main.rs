use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use depstore_core::{Graph, SaveType};
use depstore_installer::{load_graph, uninstall, ProjectLayout};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{
    resolve_project_dir, resolve_store, resolve_uninstall_options, CliOverrides, DepstoreConfig,
};
use render::{format_uninstall_report_lines, render_status_line, OutputStyle, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "depstore")]
#[command(about = "Content-addressed package store maintenance", long_about = None)]
struct Cli {
    /// Project root; defaults to the current directory.
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove direct dependencies and every package nothing else needs.
    Uninstall {
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        save: SaveArgs,
        #[arg(long)]
        lock_stale_secs: Option<u64>,
    },
    /// Report store paths and check the dependency graph.
    Doctor,
}

#[derive(Args, Debug, Clone, Copy, Default)]
struct SaveArgs {
    /// Also drop the names from `dependencies`.
    #[arg(short = 'S', long = "save")]
    save: bool,
    /// Also drop the names from `devDependencies`.
    #[arg(short = 'D', long = "save-dev")]
    save_dev: bool,
    /// Also drop the names from `optionalDependencies`.
    #[arg(short = 'O', long = "save-optional")]
    save_optional: bool,
}

impl SaveArgs {
    fn save_type(self) -> Option<SaveType> {
        SaveType::from_flags(self.save, self.save_dev, self.save_optional)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("depstore=info,depstore_installer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let project = ProjectLayout::new(resolve_project_dir(cli.project_dir)?);
    let config = DepstoreConfig::load(&project)?;
    let renderer = TerminalRenderer::current();

    match cli.command {
        Commands::Uninstall {
            names,
            save,
            lock_stale_secs,
        } => {
            let options = resolve_uninstall_options(
                &project,
                &config,
                CliOverrides {
                    store_dir: cli.store_dir,
                    lock_stale_secs,
                    save_type: save.save_type(),
                },
            )?;
            tracing::debug!(
                store = %options.store.root().display(),
                save_type = ?options.save_type,
                "resolved uninstall options"
            );
            let report = uninstall(&names, &options)?;
            renderer.print_section("uninstall");
            renderer.print_lines(&format_uninstall_report_lines(&report, renderer.style()));
        }
        Commands::Doctor => {
            let store = resolve_store(&project, &config, cli.store_dir)?;
            let graph = load_graph(&project)?;
            renderer.print_section("doctor");
            renderer.print_lines(&format_doctor_lines(
                &project,
                store.root(),
                store.lock_path().exists(),
                &graph,
                renderer.style(),
            ));
        }
    }

    Ok(())
}

fn format_doctor_lines(
    project: &ProjectLayout,
    store_root: &Path,
    store_locked: bool,
    graph: &Graph,
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = vec![
        format!("project: {}", project.root().display()),
        format!("store: {}", store_root.display()),
        format!("graph: {}", project.graph_path().display()),
        format!("lock: {}", if store_locked { "held" } else { "free" }),
    ];

    match graph.validate() {
        Ok(()) => lines.push(render_status_line(
            style,
            "ok",
            &format!("graph consistent ({} node(s))", graph.len()),
        )),
        Err(err) => lines.push(render_status_line(
            style,
            "warn",
            &format!("graph inconsistent: {err}"),
        )),
    }

    for pkg_id in graph.unreferenced_ids() {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("orphaned package: {pkg_id}"),
        ));
    }
    lines
}
