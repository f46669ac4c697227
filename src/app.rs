use std::net::SocketAddr;

use argh::FromArgs;
use dotenv::dotenv;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{self, ApiConfig},
    database,
    repository::Repository,
};

pub struct App {
    args: Args,
}

impl App {
    pub fn new() -> Self {
        Self::with_args(argh::from_env())
    }

    pub fn with_args(args: Args) -> Self {
        Self { args }
    }

    pub async fn run(&self) -> Result<()> {
        dotenv().ok();

        miette::set_panic_hook();

        if std::env::var_os("RUST_BACKTRACE").is_none() {
            std::env::set_var("RUST_BACKTRACE", "1")
        }

        if std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", "attend_server=debug,sqlx=info")
        }

        if self.args.json {
            tracing_subscriber::fmt::fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init()
                .ok();
        } else {
            tracing_subscriber::fmt::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init()
                .ok();
        }

        // anyhow::Error does not implement std::error::Error, so `?` cannot
        // bridge it into a miette report; render it into one instead.
        let database = database::connect(
            &self.args.database_url,
            1,
            self.args.database_max_connections,
        )
        .await
        .map_err(|e| miette::miette!("{:#}", e))?;

        database
            .migrate()
            .await
            .map_err(|e| miette::miette!("{:#}", e))?;

        let repository = Repository::new(database);

        let config = ApiConfig {
            session_ttl: chrono::Duration::hours(self.args.session_ttl_hours),
            edit_window_days: self
                .args
                .enforce_edit_window
                .then_some(self.args.edit_window_days),
        };

        let router = api::build(repository, config);

        tracing::debug!(
            ip = self.args.listen_address.ip().to_string().as_str(),
            port = self.args.listen_address.port(),
            url = format!(
                "http://{}:{}",
                self.args.listen_address.ip(),
                self.args.listen_address.port()
            ),
            "server started"
        );

        let server = axum::Server::bind(&self.args.listen_address)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>());

        let graceful = server.with_graceful_shutdown(shutdown_signal());
        graceful.await.into_diagnostic()?;

        tracing::debug!("server terminated");

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to handle Ctrl-C signal");
    tracing::info!("ctrl-c received");
}

#[derive(FromArgs)]
/// The attendance server.
pub struct Args {
    /// server address:port to listen on (default: 0.0.0.0:8080, PORT environment variable can override default port 8080)
    #[argh(
        option,
        default = "SocketAddr::from(([0, 0, 0, 0], default_listen_port()))"
    )]
    pub listen_address: SocketAddr,
    /// the database URL to connect to (default: sqlite://attend.db, or DATABASE_URL environment variable)
    #[argh(option, default = "default_database_url()")]
    pub database_url: String,
    /// the maximum number of connections in the database connection pool (default: 4, or DATABASE_MAX_CONNECTIONS environment variable)
    #[argh(option, default = "default_database_max_connections()")]
    pub database_max_connections: u32,
    /// use JSON for log messages
    #[argh(switch)]
    pub json: bool,
    /// how long issued session tokens stay valid, in hours (default: 12)
    #[argh(option, default = "DEFAULT_SESSION_TTL_HOURS")]
    pub session_ttl_hours: i64,
    /// reject attendance writes dated outside the edit window
    #[argh(switch)]
    pub enforce_edit_window: bool,
    /// length of the attendance edit window in days, counting back from today (default: 30)
    #[argh(option, default = "DEFAULT_EDIT_WINDOW_DAYS")]
    pub edit_window_days: i64,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], default_listen_port())),
            database_url: default_database_url(),
            database_max_connections: default_database_max_connections(),
            json: false,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            enforce_edit_window: false,
            edit_window_days: DEFAULT_EDIT_WINDOW_DAYS,
        }
    }
}

const DEFAULT_LISTEN_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_EDIT_WINDOW_DAYS: i64 = 30;

fn default_listen_port() -> u16 {
    if let Ok(port_str) = std::env::var("PORT") {
        if let Ok(port) = port_str.parse() {
            tracing::debug!("using port from PORT environment variable");
            port
        } else {
            DEFAULT_LISTEN_PORT
        }
    } else {
        DEFAULT_LISTEN_PORT
    }
}

const DEFAULT_DATABASE_URL: &str = "sqlite://attend.db";

fn default_database_url() -> String {
    if let Ok(value) = std::env::var("DATABASE_URL") {
        value
    } else {
        DEFAULT_DATABASE_URL.to_string()
    }
}

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 4;

fn default_database_max_connections() -> u32 {
    if let Ok(value) = std::env::var("DATABASE_MAX_CONNECTIONS") {
        value
            .parse()
            .ok()
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS)
    } else {
        DEFAULT_DATABASE_MAX_CONNECTIONS
    }
}
