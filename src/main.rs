use anyhow::{Context, bail};
use clap::Parser;
use library_circulation::{
    adapters::{
        clock::SystemClock,
        memory::InMemoryLibrary,
        postgres::{PostgresLibrary, run_migrations},
    },
    api::{AppState, create_router},
    application::ServiceDependencies,
    config::{Cli, Command, StoreConfig, StoreKind},
    interpreter::Interpreter,
    ports::Library,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Initialize tracing; logs go to stderr so script output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_circulation=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => {
            if cli.store.store != StoreKind::Postgres {
                bail!("migrations only apply to the postgres store");
            }
            let pool = connect(&cli.store).await?;
            run_migrations(&pool)
                .await
                .context("failed to apply migrations")?;
            tracing::info!("migrations applied");
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            script,
            stop_on_error,
        } => {
            let deps = build_dependencies(&cli.store).await?;
            let mut interpreter = Interpreter::new(deps, std::io::stdout()).stop_on_error(stop_on_error);

            let summary = match script {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    interpreter.run(BufReader::new(file)).await?
                }
                None => interpreter.run(BufReader::new(tokio::io::stdin())).await?,
            };

            if summary.failed > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Serve { host, port } => {
            let deps = build_dependencies(&cli.store).await?;
            let app = create_router(Arc::new(AppState { deps }));

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind to {}", addr))?;

            tracing::info!("Server listening on {}", addr);

            axum::serve(listener, app)
                .await
                .context("server terminated")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn connect(config: &StoreConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")
}

async fn build_dependencies(config: &StoreConfig) -> anyhow::Result<ServiceDependencies> {
    let library: Arc<dyn Library> = match config.store {
        StoreKind::Postgres => {
            let pool = connect(config).await?;
            tracing::info!(isolation = ?config.isolation, "using postgres store");
            Arc::new(PostgresLibrary::new(pool, config.isolation))
        }
        StoreKind::Memory => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryLibrary::new())
        }
    };

    Ok(ServiceDependencies {
        library,
        clock: Arc::new(SystemClock),
    })
}
