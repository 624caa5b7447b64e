use anyhow::{Context, Result};
use bundle_dlls::{
    bundle, Compressor, Config, DependencyWalker, Objdump, ResolutionPolicy, Upx, DEFAULT_OBJDUMP,
    DEFAULT_UPX,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bundle-dlls")]
#[command(version)]
#[command(about = "List or bundle the DLLs a Windows executable depends on", long_about = None)]
struct Args {
    /// Executable or DLL to analyze
    exe_file: PathBuf,

    /// Copy the dependencies next to the executable
    #[arg(short, long)]
    copy: bool,

    /// Compress copied DLLs with upx (requires --copy)
    #[arg(long)]
    upx: bool,

    /// Extra directory to search for DLLs; repeatable, first has highest priority
    #[arg(short = 'L', long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// objdump executable to use
    #[arg(long, default_value = DEFAULT_OBJDUMP)]
    objdump: String,

    /// upx executable to use
    #[arg(long, default_value = DEFAULT_UPX)]
    upx_path: String,

    /// Extra DLL name to treat as provided by Windows; repeatable
    #[arg(short, long = "blacklist", value_name = "DLL")]
    blacklist: Vec<String>,

    /// Skip DLLs that cannot be found instead of failing
    #[arg(long)]
    skip_missing: bool,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<()> {
    let policy = if args.skip_missing {
        ResolutionPolicy::SkipMissing
    } else {
        ResolutionPolicy::FailOnMissing
    };

    // CLI paths end up ahead of the environment ones.
    let config = Config::new()
        .with_env_search_paths()
        .with_search_paths(args.search_paths)
        .with_blacklist(&args.blacklist)
        .with_policy(policy)
        .with_objdump(args.objdump)
        .with_upx(args.upx_path)
        .with_copy(args.copy)
        .with_compress(args.upx);
    config.validate()?;

    let inspector = Objdump::new(config.objdump.clone());
    let walker = DependencyWalker::new(
        &inspector,
        &config.search_paths,
        &config.blacklist,
        config.policy,
    );
    let deps = walker.walk(&args.exe_file)?;

    for dep in &deps {
        println!("{}", dep.display());
    }

    if config.copy {
        let image = std::path::absolute(&args.exe_file)
            .with_context(|| format!("Failed to resolve {}", args.exe_file.display()))?;
        let target_dir = image
            .parent()
            .context("Executable path has no parent directory")?;

        let upx = Upx::new(config.upx.clone());
        let compressor = config.compress.then_some(&upx as &dyn Compressor);
        let report = bundle(&deps, target_dir, compressor);

        log::info!(
            "Bundled into {}: {} copied, {} already present, {} compressed",
            target_dir.display(),
            report.copied.len(),
            report.skipped.len(),
            report.compressed.len()
        );
        for (path, cause) in &report.failures {
            eprintln!("failed: {}: {}", path.display(), cause);
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    setup_logging(&args.log_level);

    if let Err(e) = run(args) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
