//! reqscope: demo server for the per-request lifecycle.
//!
//! Serves a few routes that exercise route parameters, query and body
//! views, and pooled connections borrowed through the request.
//!
//! Usage:
//!   reqscope                                     # Default port 8080, in-memory store
//!   reqscope --port 9000 --verbose               # Custom port, debug logs
//!   reqscope --pg-host localhost --pg-database app --pg-user app
//!                                                # Also register PostgreSQL as "psql"

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rq_container::{Environment, Services};
use rq_database::{
    DatabaseConnectable, DatabaseIdentifier, Databases, DatabasesProvider, MemoryDatabase,
    PoolConfig, PostgresConfig, PostgresDatabase,
};
use rq_http::{Abort, MediaType, Response, Status};
use rq_request::{ReleaseFailurePolicy, Request, RequestConfig};
use rq_server::{
    Application, HandlerResult, RequestLogging, Router, ServerConfig, TransportServer,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqscope", about = "reqscope: request-scoped services demo server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Connections per pool
    #[arg(long, default_value = "10")]
    max_connections: usize,

    /// Seconds to wait for a pooled connection
    #[arg(long, default_value = "10")]
    acquire_timeout: u64,

    /// Enable permissive CORS
    #[arg(long)]
    cors: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// PostgreSQL host; registers the "psql" database when set
    #[arg(long)]
    pg_host: Option<String>,

    #[arg(long, default_value = "5432")]
    pg_port: u16,

    #[arg(long, default_value = "postgres")]
    pg_database: String,

    #[arg(long, default_value = "postgres")]
    pg_user: String,

    #[arg(long, env = "REQSCOPE_PG_PASSWORD", hide_env_values = true)]
    pg_password: Option<String>,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (&cli.log_file, cli.json_logs) {
        (Some(path), json) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let builder = builder.with_writer(std::sync::Mutex::new(file)).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            eprintln!("Logging to {}", path.display());
        }
        (None, true) => builder.json().init(),
        (None, false) => builder.init(),
    }
    Ok(())
}

fn memory_store() -> DatabaseIdentifier<MemoryDatabase> {
    DatabaseIdentifier::new("memory")
}

#[derive(Debug, Deserialize)]
struct Search {
    q: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn hello(request: Request) -> HandlerResult {
    let name: String = request.parameters.get_as("name")?;
    Ok(Response::text(format!("Hello, {name}!")))
}

async fn search(request: Request) -> HandlerResult {
    let search: Search = request.query().decode()?;
    Response::json(&json!({ "q": search.q, "limit": search.limit.unwrap_or(10) }))
}

/// Wraps the decoded body in `{"echo": ...}`, writing it back through the
/// content view before responding with the message's new body.
async fn echo(mut request: Request) -> HandlerResult {
    {
        let mut content = request.content();
        let body: serde_json::Value = content.decode()?;
        content.encode(&json!({ "echo": body }), MediaType::json())?;
    }
    let body = request.http.body().clone();
    Ok(Response::new(Status::Ok).with_body(body, MediaType::json()))
}

async fn increment(request: Request) -> HandlerResult {
    let key: String = request.parameters.get_as("key")?;
    let by = request.query().get_as::<i64>("by")?.unwrap_or(1);
    let conn = request.connect(Some(&memory_store())).await?;
    let value = conn.increment(&key, by);
    Response::json(&json!({ "key": key, "value": value, "connection": conn.id() }))
}

async fn counter(request: Request) -> HandlerResult {
    let key: String = request.parameters.get_as("key")?;
    let conn = request.connect(Some(&memory_store())).await?;
    match conn.get(&key) {
        Some(value) => Response::json(&json!({ "key": key, "value": value })),
        None => Err(Abort::not_found(&request.http.path)),
    }
}

fn routes(router: &mut Router) {
    router
        .get("/hello/:name", hello)
        .get("/search", search)
        .post("/echo", echo)
        .post("/counter/:key", increment)
        .get("/counter/:key", counter);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let environment = Environment::detect();
    let pool_config = PoolConfig {
        max_connections: cli.max_connections,
        acquire_timeout: Some(Duration::from_secs(cli.acquire_timeout)),
    };

    let mut databases = Databases::new();
    databases.add(&memory_store(), MemoryDatabase::new(), pool_config.clone());
    if let Some(host) = cli.pg_host.clone() {
        let config = PostgresConfig {
            host,
            port: cli.pg_port,
            database: cli.pg_database.clone(),
            username: cli.pg_user.clone(),
            password: cli.pg_password.clone().map(SecretString::from),
            connection_timeout: Some(cli.acquire_timeout),
        };
        databases.add(
            &DatabaseIdentifier::<PostgresDatabase>::new("psql"),
            PostgresDatabase::new(config),
            pool_config,
        );
    }

    let mut services = Services::new();
    services.provider(DatabasesProvider::new(databases))?;
    services.instance(RequestConfig {
        release_failure: if environment.is_release {
            ReleaseFailurePolicy::Log
        } else {
            ReleaseFailurePolicy::Panic
        },
    });

    let mut app = Application::new(services, environment);
    app.add_middleware(RequestLogging);
    routes(app.router_mut());

    let app = Arc::new(app);
    app.boot().await.context("booting application")?;

    let config = ServerConfig {
        hostname: cli.hostname.clone(),
        port: cli.port,
        enable_cors: cli.cors,
        ..ServerConfig::default()
    };
    let mut transport = TransportServer::start(config, app.clone())
        .await
        .context("starting transport")?;

    info!(
        "reqscope listening on http://{}:{} ({})",
        cli.hostname,
        transport.port(),
        app.environment()
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    info!("Shutting down...");
    transport.stop().await;
    app.shutdown().await;
    Ok(())
}
