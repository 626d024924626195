//! # Printtique
//!
//! Shell around the design core.
//!
//! ```bash
//! # Replay a customer's editing session and keep the result
//! printtique customer session.toml --out design.json
//!
//! # Dashboard listings
//! printtique admin orders --status pending
//! printtique admin print "#ORD-001" design.json
//!
//! # Side-by-side preview from the two rendered sides
//! printtique export design.json --front front.png --back back.png
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use clap::{Parser, Subcommand};
use printtique_core::{
    catalog::{Catalog, CANVAS_SIZE},
    io::DesignSnapshot,
    projection::{tools::ToolState, NoneResolved},
    session::DesignSession,
    state::DesignDocument,
};

mod admin;
mod config;
mod export;
mod script;

#[derive(Parser, Debug)]
#[command(name = "printtique")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog TOML to use instead of the configured one
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Replay a customer design script
    Customer {
        script: PathBuf,
        /// Continue from a saved design instead of starting blank
        #[arg(long, value_name = "FILE")]
        design: Option<PathBuf>,
        /// Write the finished design here
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Orders, products and assets
    Admin {
        #[command(subcommand)]
        view: AdminView,
    },
    /// Compose a side-by-side preview of a design
    Export {
        design: PathBuf,
        /// Rendered front side
        #[arg(long, value_name = "FILE")]
        front: Option<PathBuf>,
        /// Rendered back side
        #[arg(long, value_name = "FILE")]
        back: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Also write the render plans of both sides, as JSON
        #[arg(long, value_name = "FILE")]
        plans: Option<PathBuf>,
    },
    /// Write the preferences file, with defaults for anything unset
    Preferences,
}

#[derive(Subcommand, Debug)]
enum AdminView {
    Orders {
        /// pending, processing or shipped
        #[arg(long)]
        status: Option<String>,
        /// Match order id or customer name
        #[arg(long)]
        search: Option<String>,
    },
    Products,
    Assets,
    /// Describe the high-resolution print job for an order's design
    Print {
        order: String,
        design: PathBuf,
        /// Write the job as JSON
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn read_snapshot(path: &Path) -> AnyResult<DesignSnapshot> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {path:?}"))?;
    DesignSnapshot::read_from(std::io::BufReader::new(file))
        .with_context(|| format!("failed to read design {path:?}"))
}
fn read_design(path: &Path) -> AnyResult<DesignDocument> {
    Ok(read_snapshot(path)?.into_document()?)
}
fn write_json(path: &Path, value: &impl serde::Serialize) -> AnyResult<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("failed to create {path:?}"))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}

fn customer(
    catalog: Arc<Catalog>,
    preferences: &config::Preferences,
    script_path: &Path,
    design: Option<&Path>,
    out: Option<PathBuf>,
) -> AnyResult<()> {
    let string = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {script_path:?}"))?;
    let parsed = script::Script::from_toml_str(&string)
        .with_context(|| format!("invalid script {script_path:?}"))?;
    let session = match design {
        Some(path) => DesignSession::from_document(catalog, read_design(path)?),
        None => DesignSession::new(catalog)?,
    }
    .with_upload_policy(preferences.upload_policy());
    let base = script_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut runner = script::Runner::new(session, ToolState::new(preferences.drawing), base);
    let summary = runner.run(&parsed)?;
    println!(
        "{} steps applied, {} skipped",
        summary.applied, summary.skipped
    );
    if let Some(out) = out {
        let mut session = runner.into_session();
        write_json(&out, &DesignSnapshot::capture(&session.document()))?;
        session.mark_saved(out.clone());
        println!("design written to {}", out.display());
    }
    Ok(())
}

fn admin_view(catalog: &Catalog, view: AdminView) -> AnyResult<()> {
    match view {
        AdminView::Orders { status, search } => {
            let status = status.as_deref().map(admin::parse_status).transpose()?;
            print!(
                "{}",
                admin::orders_table(admin::filter_orders(catalog, status, search.as_deref()))
            );
        }
        AdminView::Products => print!("{}", admin::products_table(catalog)),
        AdminView::Assets => print!("{}", admin::assets_listing(catalog)),
        AdminView::Print { order, design, out } => {
            let job = admin::PrintJob::from_snapshot(catalog, &order, read_snapshot(&design)?)?;
            println!("{}", job.describe());
            if let Some(out) = out {
                write_json(&out, &job)?;
            }
        }
    }
    Ok(())
}

fn export_preview(
    catalog: Arc<Catalog>,
    preferences: &config::Preferences,
    design: &Path,
    renders: [Option<PathBuf>; 2],
    out_dir: &Path,
    plans: Option<PathBuf>,
) -> AnyResult<()> {
    let document = read_design(design)?;
    let product_name = catalog
        .resolve(document.garment())
        .map(|(product, _)| product.name.clone())
        .ok_or_else(|| anyhow::anyhow!("design is for a garment not in the catalog"))?;
    let mut session = DesignSession::from_document(catalog, document);
    if let Some(plans) = plans {
        write_json(&plans, &export::preview_plans(&mut session, &NoneResolved)?)?;
    }

    let [front, back] = renders;
    let (front, back) = export::load_renders(front.as_deref(), back.as_deref())?;
    let layout = export::PreviewLayout::new(CANVAS_SIZE, preferences.export);
    let sheet = layout.compose(front.as_ref(), back.as_ref());

    let path = out_dir.join(export::file_name(
        &product_name,
        chrono::Utc::now().timestamp_millis(),
    ));
    sheet
        .save(&path)
        .with_context(|| format!("failed to write preview {path:?}"))?;
    println!("{}", path.display());
    Ok(())
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let cli = Cli::parse();
    let mut preferences = config::Preferences::load();
    if cli.catalog.is_some() {
        preferences.catalog = cli.catalog;
    }
    let catalog = Arc::new(preferences.catalog()?);

    match cli.mode {
        Mode::Customer {
            script,
            design,
            out,
        } => customer(catalog, &preferences, &script, design.as_deref(), out),
        Mode::Admin { view } => admin_view(&catalog, view),
        Mode::Export {
            design,
            front,
            back,
            out_dir,
            plans,
        } => export_preview(
            catalog,
            &preferences,
            &design,
            [front, back],
            &out_dir,
            plans,
        ),
        Mode::Preferences => {
            preferences.save()?;
            if let Some(dir) = config::preferences_dir() {
                println!("preferences written to {}", dir.display());
            }
            Ok(())
        }
    }
}
