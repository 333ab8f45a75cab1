use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::{Parser, ValueEnum};
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use online_atm::{
    AppState, build_router, get_local_offset, graceful_shutdown, logging_middleware,
    provider::{AuthProvider, DataStore, SqliteProvider, SupabaseConfig, SupabaseProvider},
};

/// Which identity and data provider to use.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    /// A local SQLite database.
    Sqlite,
    /// A hosted Supabase project.
    Supabase,
}

/// The web server for the Online ATM.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database used by the sqlite provider.
    #[arg(long, default_value = "online_atm.db")]
    db_path: String,

    /// Directory holding an SSL certificate `cert.pem` and key `key.pem`.
    ///
    /// Without it the app is served over plain HTTP and the session cookie is
    /// not marked secure.
    #[arg(long)]
    cert_path: Option<PathBuf>,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical timezone to show times in, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// How long a session lasts with the sqlite provider, in minutes.
    #[arg(long, default_value_t = 60)]
    session_minutes: u32,

    /// Where identities, profiles and transactions are kept.
    #[arg(long, value_enum, default_value_t = ProviderKind::Sqlite)]
    provider: ProviderKind,

    /// The Supabase project URL, required by the supabase provider.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// How long to wait for the supabase provider before giving up, in seconds.
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// The secret used to encrypt session cookies.
    #[arg(long, env = "SECRET", hide_env_values = true)]
    secret: String,

    /// The Supabase anonymous key, used for sign up and log in.
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: Option<String>,

    /// The Supabase service key, used for reading and writing tables.
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    supabase_service_key: Option<String>,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if get_local_offset(&args.timezone).is_none() {
        tracing::error!(
            "\"{}\" is not a valid canonical timezone name, e.g. \"Pacific/Auckland\"",
            args.timezone
        );
        std::process::exit(1);
    }

    let tls_config = match &args.cert_path {
        Some(cert_path) => Some(
            RustlsConfig::from_pem_file(cert_path.join("cert.pem"), cert_path.join("key.pem"))
                .await
                .expect("Could not open TLS certificates."),
        ),
        None => None,
    };

    let (auth, store) = create_provider(&args);
    let state = AppState::new(&args.secret, &args.timezone, auth, store)
        .with_secure_cookies(tls_config.is_some());

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    match tls_config {
        Some(tls_config) => {
            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("Could not start server");
        }
        None => {
            tracing::warn!(
                "No --cert-path given, serving plain HTTP on {} with insecure session cookies",
                addr
            );
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("Could not start server");
        }
    }
}

fn create_provider(args: &Args) -> (Arc<dyn AuthProvider>, Arc<dyn DataStore>) {
    match args.provider {
        ProviderKind::Sqlite => {
            let connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
                panic!("Could not open database at {}: {error}", args.db_path)
            });
            let provider = SqliteProvider::new(connection)
                .expect("Could not initialize database")
                .with_session_duration(time::Duration::minutes(args.session_minutes.into()));
            tracing::info!(
                "Using SQLite database at {} with sessions lasting {}",
                args.db_path,
                provider.session_duration()
            );

            let provider = Arc::new(provider);
            let auth: Arc<dyn AuthProvider> = provider.clone();
            let store: Arc<dyn DataStore> = provider;
            (auth, store)
        }
        ProviderKind::Supabase => {
            let config = SupabaseConfig {
                url: args
                    .supabase_url
                    .clone()
                    .expect("--supabase-url must be set to use the supabase provider"),
                anon_key: args
                    .supabase_anon_key
                    .clone()
                    .expect("SUPABASE_ANON_KEY must be set to use the supabase provider"),
                service_key: args
                    .supabase_service_key
                    .clone()
                    .expect("SUPABASE_SERVICE_KEY must be set to use the supabase provider"),
                timeout: Duration::from_secs(args.request_timeout_secs),
            };
            tracing::info!("Using Supabase project at {}", config.url);

            let provider =
                Arc::new(SupabaseProvider::new(config).expect("Could not create HTTP client"));
            let auth: Arc<dyn AuthProvider> = provider.clone();
            let store: Arc<dyn DataStore> = provider;
            (auth, store)
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(
                    filter::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| filter::EnvFilter::new("debug")),
                ),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
