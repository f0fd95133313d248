use std::{path::PathBuf, process};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use autorig::{
    pipeline::{prepare_request, rig_mesh},
    project::{load_recorded_solution, load_rig_project, save_json, save_rig_project},
};

/// Embed a skeleton into a static mesh and transfer skinning weights
#[derive(Parser, Debug)]
#[command(name = "autorig", version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the solver input for a rig project
    Prepare {
        /// Rig project JSON (mesh, skeleton, settings)
        #[arg(short, long)]
        project: PathBuf,

        /// Where to write the solver request JSON
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Apply a recorded solver solution and write the rigged project
    Apply {
        /// Rig project JSON (mesh, skeleton, settings)
        #[arg(short, long)]
        project: PathBuf,

        /// Solver solution JSON
        #[arg(short, long)]
        solution: PathBuf,

        /// Where to write the rigged project JSON
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(err) = run(args.command) {
        error!("{err:#}");
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Prepare { project, out } => {
            let rig = load_rig_project(&project)?;
            let request = prepare_request(&rig.mesh, &rig.skeleton, &rig.settings)
                .context("failed to prepare solver request")?;
            save_json(&out, &request, "solver request")?;

            println!(
                "Solver request: {} vertices, {} faces, {} joints (scale {:.4})",
                request.mesh.vertices.len(),
                request.mesh.face_count(),
                request.skeleton.len(),
                request.normalization.scale
            );
        }
        Command::Apply {
            project,
            solution,
            out,
        } => {
            let mut rig = load_rig_project(&project)?;
            let solver = load_recorded_solution(&solution)?;
            info!("Applying solution {}", solution.display());

            let report = rig_mesh(&solver, &mut rig.mesh, &mut rig.skeleton, &rig.settings)
                .context("rigging failed")?;
            save_rig_project(&out, &rig)?;

            println!(
                "Vertices: {} -> {} ({} merged)",
                report.vertices_before, report.vertices_after, report.vertices_merged
            );
            println!(
                "Joints: {}, Influences: {} (scale {:.4})",
                report.solver_joints, report.influences_written, report.normalization.scale
            );
        }
    }
    Ok(())
}
