use std::{
    path::{Path, PathBuf},
    process,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use meshweave::container::{ContainerView, load_container, save_container};
use meshweave::convert::{
    ImportReport, Severity, diagnostic_log_path_for_output, flatten_model, reconstruct_model,
    write_import_diagnostic_log,
};
use meshweave::project::{ConvertSettings, load_convert_settings, resolve_path};
use meshweave::skeleton::{BoneTable, Skeleton, load_skeleton};
use meshweave::{init_logging, log_info};

/// Rebuild interleaved mesh models from parsed containers and flatten them back
#[derive(Parser)]
#[command(name = "meshweave")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a container and print a summary per mesh
    Inspect(InspectArgs),

    /// Reconstruct a container, flatten it again and write the result
    Rebuild(RebuildArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Parsed container JSON (defaults to the settings file's container_path)
    container: Option<PathBuf>,

    /// Skeleton JSON used to resolve bone names
    #[arg(long)]
    skeleton: Option<PathBuf>,

    /// Convert settings JSON
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Args)]
struct RebuildArgs {
    /// Parsed container JSON (defaults to the settings file's container_path)
    container: Option<PathBuf>,

    /// Where to write the flattened container JSON (defaults to output_path)
    output: Option<PathBuf>,

    /// Skeleton JSON used to resolve bone names (defaults to skeleton_path)
    #[arg(long)]
    skeleton: Option<PathBuf>,

    /// Convert settings JSON
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Also write <OUTPUT>.diagnostic.json
    #[arg(long)]
    diagnostics: bool,

    /// Process meshes one at a time
    #[arg(long)]
    sequential: bool,
}

fn main() {
    init_logging("info");

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect(args) => inspect(args),
        Commands::Rebuild(args) => rebuild(args),
    }
}

fn settings_from(path: Option<&Path>) -> Result<ConvertSettings> {
    match path {
        Some(path) => load_convert_settings(path),
        None => Ok(ConvertSettings::default()),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let settings = settings_from(args.settings.as_deref())?;
    let container_path = resolve_path(
        args.container.as_deref(),
        settings.container_path.as_deref(),
        "container",
    )?;
    let skeleton_path = args
        .skeleton
        .or_else(|| settings.skeleton_path.as_deref().map(PathBuf::from));

    let container = load_container(&container_path)?;
    let skeleton = skeleton_path.as_deref().map(load_skeleton).transpose()?;
    if let Some(table) = &skeleton {
        println!("Skeleton: {} bones", table.bone_count());
    }
    let skeleton = skeleton.as_ref().map(|table| table as &dyn Skeleton);

    let report = reconstruct_model(&container, skeleton, &settings)?;
    print_import_summary(&container, &report);

    Ok(())
}

fn rebuild(args: RebuildArgs) -> Result<()> {
    let mut settings = settings_from(args.settings.as_deref())?;
    let container_path = resolve_path(
        args.container.as_deref(),
        settings.container_path.as_deref(),
        "container",
    )?;
    let output_path = resolve_path(
        args.output.as_deref(),
        settings.output_path.as_deref(),
        "output",
    )?;
    let skeleton_path = resolve_path(
        args.skeleton.as_deref(),
        settings.skeleton_path.as_deref(),
        "skeleton",
    )?;
    if args.diagnostics {
        settings.write_diagnostics = true;
    }
    if args.sequential {
        settings.parallel_meshes = false;
    }

    let container = load_container(&container_path)?;
    let skeleton: BoneTable = load_skeleton(&skeleton_path)?;
    println!("Skeleton: {} bones", skeleton.bone_count());

    let import = reconstruct_model(&container, Some(&skeleton), &settings)?;
    print_import_summary(&container, &import);

    if settings.write_diagnostics {
        let diagnostic_path = diagnostic_log_path_for_output(&output_path);
        write_import_diagnostic_log(&import, &container_path, &diagnostic_path)?;
        log_info!("diagnostic log written to {}", diagnostic_path.display());
    }

    let export = flatten_model(&import.model, &skeleton, &settings);
    for issue in &export.issues {
        println!("  [{:?}] {}: {}", issue.severity, issue.code, issue.message);
    }
    save_container(&output_path, &export.container)?;

    println!(
        "Written: {} ({} meshes, {} skipped on export)",
        output_path.display(),
        export.container.objects.len(),
        export.skipped_meshes.len()
    );

    Ok(())
}

fn print_import_summary(container: &dyn ContainerView, report: &ImportReport) {
    let (major, minor) = container.version();
    println!("Model: {} (version {}.{})", report.model.name, major, minor);
    println!(
        "Meshes: {}, skipped: {}",
        report.model.meshes.len(),
        report.skipped_meshes.len()
    );

    for (mesh, dropped) in report.model.meshes.iter().zip(&report.dropped_influences) {
        println!(
            "  {}[{}]: {} vertices, {} triangles, {}, dropped influences {}/{}",
            mesh.name,
            mesh.sub_index,
            mesh.vertices.len(),
            mesh.triangle_count(),
            mesh.binding.label(),
            dropped.unknown_bone,
            dropped.over_budget
        );
    }

    let errors = report
        .issues
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .count();
    println!("Issues: {} ({} errors)", report.issues.len(), errors);
    for issue in &report.issues {
        println!("  [{:?}] {}: {}", issue.severity, issue.code, issue.message);
    }
}
