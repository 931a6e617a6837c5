// main.rs

use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use clap::{Parser, ValueEnum};
use dash_loop::ManifestEngine;
use tokio::runtime;
use tracing::{debug, error, info, instrument, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, Layer};

mod handlers;
mod router;
mod types;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
enum LogLevel {
    Trace = 0, // Designates very fine-grained informational events, extremely verbose.
    Debug = 1, // Designates fine-grained informational events.
    Info = 2, // Designates informational messages.
    Warn = 3, // Designates hazardous situations.
    Error = 4, // Designates very serious errors.
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves an on-demand DASH presentation as an endless live stream")]
struct Args {
    /// Source (static) MPD to loop
    #[arg(short, long, default_value = "playlist.mpd")]
    manifest: PathBuf,
    /// Directory containing one folder of fragments per representation id.
    /// Defaults to the directory of the manifest.
    #[arg(short, long)]
    base_dir: Option<PathBuf>,
    // Set the address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    // Set the port number
    #[arg(short, long, default_value = "5000")]
    port: u16,
    // Set the log level (possible values: error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LogLevel,
    /// Number of runtime worker threads
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
}

impl Args {
    fn base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => self
                .manifest
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[instrument(skip_all)]
fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Parse command-line arguments
    let args = Args::parse();

    // Build the FmtSubscriber layer
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_filter(match args.log_level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        });

    let subscriber = tracing_subscriber::registry().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{:?}", args);

    // The manifest is loaded and converted to live before anything is served
    let base_dir = args.base_dir();
    let engine = match ManifestEngine::load(&args.manifest, &base_dir) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Unable to load {:?}: {}", args.manifest, e);
            return Err(e.into());
        }
    };

    if let Ok(xml) = engine.serialize() {
        debug!("Live MPD:\n{}", String::from_utf8_lossy(&xml));
    }

    let app = router::create_router(engine, base_dir);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(args.threads.max(1))
        .thread_name_fn(|| {
            static ATOMIC_WORKER_ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
            let id = ATOMIC_WORKER_ID.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("MAIN_R w-{}", id)
        })
        .enable_all()
        .build()?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    runtime.block_on(async move {
        let sock = socket2::Socket::new(
            match addr {
                SocketAddr::V4(_) => socket2::Domain::IPV4,
                SocketAddr::V6(_) => socket2::Domain::IPV6,
            },
            socket2::Type::STREAM, // Will become SOCK_CLOEXEC internally on Linux
            None,
        )?;

        sock.set_reuse_address(true)?;
        #[cfg(unix)]
        sock.set_reuse_port(true)?;
        sock.set_nonblocking(true)?;
        sock.bind(&addr.into())?;
        sock.listen(1024)?;

        let listener = tokio::net::TcpListener::from_std(sock.into())?;
        info!("Listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .await
    })?;

    info!("Server stopped");
    Ok(())
}
