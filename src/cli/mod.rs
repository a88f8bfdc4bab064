//! CLI layer: flag parsing, logging setup and dispatch to patch or verify.

pub mod args;

pub(crate) use args::Cli;

use std::io::Write;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zapsite::PatchError;
use zapsite::paths::{normalize_base_dir, read_module_path};
use zapsite::process::PatchContext;
use zapsite::walk::{ExcludeList, run_patch, run_verify};

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let stdout = std::io::stdout();
    let result = execute(&cli, &mut stdout.lock());

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn execute(cli: &Cli, out: &mut dyn Write) -> Result<(), PatchError> {
    let config = cli.to_config()?;

    let target = cli.path.as_path();
    let base_dir = normalize_base_dir(target)?;
    let module_path = read_module_path(&base_dir);
    let excludes = ExcludeList::parse(&cli.exclude, &base_dir);
    info!(
        path = %target.display(),
        base_dir = %base_dir.display(),
        module = %module_path,
        excludes = excludes.entries().len(),
        "Starting run"
    );

    let ctx = PatchContext::new(&config, module_path, base_dir);
    if config.verify {
        let summary = run_verify(out, target, &excludes, &ctx, cli.json)?;
        info!(total = summary.total_calls, clean = summary.is_clean(), "Verify finished");
    } else {
        let patched = run_patch(out, target, &excludes, &ctx)?;
        info!(patched, write = config.write, "Patch finished");
    }
    out.flush()?;
    Ok(())
}
