use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitlab_mirror::{
    DiskStateStore, FilterConfig, GitLabSource, Mirror, MirrorConfig, NoStateStore, StateStore,
};

/// Mirror selected folders of a GitLab project to local disk
///
/// Runs are skipped when neither the remote revision nor the
/// configuration changed since the last completed run. Do not run two
/// instances against the same destination at once.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Access token sent as PRIVATE-TOKEN
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: String,

    /// GitLab base URL (e.g. https://gitlab.example.com)
    #[arg(long, env = "GITLAB_HOST")]
    host: String,

    /// Project id or full path (e.g. 42 or group/project)
    #[arg(long, env = "GITLAB_PROJECT")]
    project: String,

    /// Branch, tag or commit to mirror
    #[arg(long = "ref", env = "GITLAB_REF", default_value = gitlab_mirror::config::DEFAULT_REF)]
    reference: String,

    /// Comma separated folder terms; a folder is walked if its path contains one
    #[arg(long, env = "GITLAB_MIRROR_INCLUDE", default_value = "")]
    include: String,

    /// Destination directory
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Comma separated top-level folders to mirror
    #[arg(long, default_value = "proto,build")]
    roots: String,

    /// Maximum number of concurrent remote requests
    #[arg(short = 'j', long, default_value_t = gitlab_mirror::config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Where run state is kept between invocations
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Download even if nothing changed, and leave saved state untouched
    #[arg(long)]
    force: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gitlab_mirror=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn state_store(args: &Args) -> Result<Arc<dyn StateStore>> {
    if args.force {
        return Ok(Arc::new(NoStateStore));
    }

    let dir = match &args.state_dir {
        Some(dir) => dir.clone(),
        None => DiskStateStore::default_dir()
            .context("no cache directory on this platform, pass --state-dir")?,
    };
    let store = DiskStateStore::new(dir).await?;
    tracing::debug!(dir = %store.root_dir().display(), "using state directory");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let destination = if args.dest.is_absolute() {
        args.dest.clone()
    } else {
        std::env::current_dir()
            .context("reading current directory")?
            .join(&args.dest)
    };

    let config = MirrorConfig::new(&args.host, &args.project, destination)
        .with_reference(&args.reference)
        .with_filter(FilterConfig::parse(&args.include))
        .with_roots(args.roots.split(','))
        .with_concurrency(args.concurrency);
    config.validate()?;

    let source = GitLabSource::new(&config.host, &config.project, &args.token)?;
    let state = state_store(&args).await?;
    let mirror = Mirror::new(Arc::new(source), state, config);

    mirror
        .run()
        .await
        .with_context(|| format!("mirroring {} at {}", args.project, args.reference))?;

    Ok(())
}
