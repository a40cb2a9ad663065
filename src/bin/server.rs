use std::{env, fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use bank_login_sim::{
    AppState, LogInPageConfig, build_router, graceful_shutdown, logging_middleware,
    prune_sessions_periodically,
};

/// How often idle sessions are looked for and removed.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// The web server for the simulated bank log-in page.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding an SSL certificate `cert.pem` and key `key.pem`.
    /// The server uses plain HTTP if this is not set.
    #[arg(long)]
    cert_path: Option<String>,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The bank name shown on the log-in page.
    #[arg(long, default_value = "Example Bank")]
    bank_name: String,

    /// How many seconds the log-in page waits before redirecting.
    #[arg(long, default_value_t = 10)]
    redirect_delay_secs: u64,

    /// How many hours an idle session is kept.
    #[arg(long, default_value_t = 24)]
    session_ttl_hours: i64,

    /// Where the browser goes after logging in.
    #[arg(long, default_value = bank_login_sim::DEFAULT_ACCOUNT_OVERVIEW_URL)]
    account_overview_url: String,

    /// The target of the "Transfer Funds" link.
    #[arg(long, default_value = bank_login_sim::DEFAULT_TRANSFER_FUNDS_URL)]
    transfer_funds_url: String,

    /// The target of the "Contact Us" link.
    #[arg(long, default_value = bank_login_sim::DEFAULT_CONTACT_URL)]
    contact_url: String,

    /// The target of the "About Us" link.
    #[arg(long, default_value = bank_login_sim::DEFAULT_ABOUT_URL)]
    about_url: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let page_config = LogInPageConfig {
        bank_name: args.bank_name,
        redirect_delay: Duration::from_secs(args.redirect_delay_secs),
        account_overview_url: args.account_overview_url,
        transfer_funds_url: args.transfer_funds_url,
        contact_url: args.contact_url,
        about_url: args.about_url,
    };
    let session_ttl = time::Duration::hours(args.session_ttl_hours);
    let state = AppState::new(&secret, args.cert_path.is_some(), page_config)
        .with_session_ttl(session_ttl);

    tokio::spawn(prune_sessions_periodically(
        state.session_store.clone(),
        SESSION_PRUNE_INTERVAL,
        session_ttl,
    ));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    match args.cert_path {
        Some(cert_path) => {
            let tls_config = RustlsConfig::from_pem_file(
                PathBuf::from(&cert_path).join("cert.pem"),
                PathBuf::from(&cert_path).join("key.pem"),
            )
            .await
            .expect("Could not open TLS certificates.");

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("Could not start HTTPS server");
        }
        None => {
            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .expect("Could not start HTTP server");
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
                .with_filter(filter::LevelFilter::DEBUG),
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
