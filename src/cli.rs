use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use time::UtcOffset;
use trendsync::config::{
    DEFAULT_CREDENTIALS, DEFAULT_PORT, ServeConfig, StoreSettings, SyncConfig,
};

pub(crate) enum RunOutcome {
    Serve(ServeConfig),
    Sync(SyncConfig),
    Exit(u8),
}

pub(crate) fn run(local_offset: UtcOffset) -> RunOutcome {
    let cli = Cli::parse();
    let resolved = match cli.command {
        Command::Serve(args) => resolve_serve_config(args, local_offset).map(RunOutcome::Serve),
        Command::Sync(args) => resolve_sync_config(args, local_offset).map(RunOutcome::Sync),
    };
    match resolved {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "trendsync",
    version,
    about = "Growth stats sync and a no-cache development file server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a directory with HTTP caching disabled.
    Serve(ServeArgs),
    /// Recompute the growth trend summary and write it back to Firestore.
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "TRENDSYNC_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[arg(long, env = "TRENDSYNC_CREDENTIALS", default_value = DEFAULT_CREDENTIALS)]
    credentials: PathBuf,
    #[arg(long, env = "TRENDSYNC_CONFIG")]
    config: Option<PathBuf>,
    /// Print the summary document instead of writing it.
    #[arg(long)]
    dry_run: bool,
}

fn resolve_serve_config(args: ServeArgs, local_offset: UtcOffset) -> Result<ServeConfig, String> {
    let root = std::fs::canonicalize(&args.root)
        .map_err(|err| format!("failed to resolve root directory {}: {err}", args.root.display()))?;
    if !root.is_dir() {
        return Err(format!("root path is not a directory: {}", root.display()));
    }
    Ok(ServeConfig {
        addr: SocketAddr::new(args.bind, args.port),
        root,
        local_offset,
    })
}

fn resolve_sync_config(args: SyncArgs, local_offset: UtcOffset) -> Result<SyncConfig, String> {
    let store = match args.config.as_deref() {
        Some(path) => StoreSettings::load(path).map_err(|err| err.to_string())?,
        None => StoreSettings::default(),
    };
    Ok(SyncConfig {
        credentials: args.credentials,
        store,
        dry_run: args.dry_run,
        local_offset,
    })
}
