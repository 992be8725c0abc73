use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "layergen", version)]
struct Cli {
    /// Log filter used when `RUST_LOG` is not set (e.g. `info`, `layergen=debug`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate every edition configuration into an output directory.
    Generate(GenerateArgs),
    /// Aggregate the metadata files of an output directory into one CSV file.
    Export(ExportArgs),
    /// Validate a generator document.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Generator document JSON.
    #[arg(long)]
    config: PathBuf,

    /// Output directory (created when missing).
    #[arg(long)]
    out: PathBuf,

    /// Root for relative asset paths. Defaults to the config file's directory.
    #[arg(long)]
    assets_root: Option<PathBuf>,

    /// Run seed. A random seed is drawn and logged when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (concurrency cap). Defaults to the number of CPUs.
    #[arg(long)]
    threads: Option<usize>,

    /// Items scheduled per batch.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Bounded channel capacity between workers and the writer.
    #[arg(long, default_value_t = 4)]
    channel_capacity: usize,

    /// Record failed items and keep generating instead of stopping at the first failure.
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// Extra attempts for each failed output write.
    #[arg(long, default_value_t = 2)]
    write_retries: u32,

    /// Also export all metadata of the output directory to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Directory holding `*.json` metadata files.
    #[arg(long)]
    dir: PathBuf,

    /// Output CSV path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Generator document JSON.
    #[arg(long)]
    config: PathBuf,

    /// Also list every reachable asset directory below this root.
    #[arg(long)]
    assets_root: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Export(args) => cmd_export(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log level '{default_filter}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_tree(config: &Path) -> anyhow::Result<layergen::CategoryTree> {
    let cfg = layergen::GeneratorConfig::from_path(config)?;
    let tree = layergen::CategoryTree::new(cfg)?;
    Ok(tree)
}

fn default_assets_root(config: &Path) -> PathBuf {
    config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let tree = load_tree(&args.config)?;
    let assets_root = args
        .assets_root
        .unwrap_or_else(|| default_assets_root(&args.config));

    let session = layergen::GenerateSession::new(
        tree,
        assets_root,
        layergen::GenerateSessionOpts {
            threads: args.threads,
            chunk_size: args.chunk_size,
            channel_capacity: args.channel_capacity,
            seed: args.seed,
            keep_going: args.keep_going,
        },
    );
    let mut sink = layergen::FsItemSink::new(&args.out).with_write_retries(args.write_retries);
    let report = session.run(&mut sink)?;

    eprintln!(
        "wrote {}/{} items to {} (seed {}, {} layers skipped)",
        report.items_written,
        report.items_total,
        sink.out_dir().display(),
        report.run_seed,
        report.layers_skipped
    );

    if let Some(csv) = &args.csv {
        let rows = layergen::write_csv_file(sink.out_dir(), csv)?;
        eprintln!("wrote {rows} rows to {}", csv.display());
    }

    if !report.failures.is_empty() {
        for f in &report.failures {
            eprintln!("failed {}: {}", f.stem, f.error);
        }
        anyhow::bail!(
            "{} of {} items failed",
            report.failures.len(),
            report.items_total
        );
    }
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let rows = layergen::write_csv_file(&args.dir, &args.out)
        .with_context(|| format!("export '{}'", args.dir.display()))?;
    eprintln!("wrote {rows} rows to {}", args.out.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let cfg = layergen::GeneratorConfig::from_path(&args.config)?;
    let total = cfg.total_items();
    let tree = layergen::CategoryTree::new(cfg)?;

    if let Some(root) = args.assets_root {
        let assets = layergen::FsAssetSource::new(root);
        let compositor = layergen::ImageCompositor::default();
        layergen::EditionDriver::new(&tree, &assets, &compositor, 0)
            .preflight()
            .with_context(|| format!("check assets under '{}'", assets.root().display()))?;
    }

    eprintln!(
        "ok: {} edition configuration(s), {} item(s), {} asset director(ies)",
        tree.editions().len(),
        total,
        tree.leaves().len()
    );
    Ok(())
}
