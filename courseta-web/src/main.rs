//! Courseta Web Server
//!
//! Serves the one inbound operation: a student question in, an answer
//! grounded in the latest ingested snapshot out.

use clap::Parser;
use courseta_core::init_logging;
use courseta_web::server::CoursetaServerBuilder;
use courseta_web::WebConfig;

/// Courseta web server
#[derive(Parser)]
#[command(name = "courseta-web")]
#[command(about = "HTTP API answering course questions from the ingested corpus")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Path of the persisted snapshot
    #[arg(long)]
    snapshot: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    std::env::set_var(
        "RUST_LOG",
        format!("courseta_web={0},courseta_answer={0},tower_http=info", args.log_level),
    );
    init_logging();

    dotenvy::dotenv().ok();

    let mut config = WebConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    config.dev_mode = args.dev;
    if let Some(snapshot) = args.snapshot {
        config.snapshot_path = snapshot;
    }

    println!("🚀 Starting Courseta web server");
    println!("📍 Server: http://{}", config.address());
    println!("🗃️  Snapshot: {}", config.snapshot_path);

    if std::env::var("AIPROXY_TOKEN").is_err() {
        println!("⚠️  AIPROXY_TOKEN is not set; the server cannot start without it.");
    }

    let server = match CoursetaServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .dev_mode(config.dev_mode)
        .snapshot_path(config.snapshot_path.clone())
        .build()
    {
        Ok(server) => server,
        Err(e) => {
            eprintln!("❌ Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("❌ Server failed: {}", e);
        std::process::exit(1);
    }
}
