use db_provision::{run_provision, FileSecretStore, Settings};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolves when the process receives SIGINT or SIGTERM. A handler that
/// cannot be installed stays pending: it must not read as a received signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Local dev convenience; deployed runs get their environment from the
    // runtime.
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let store = FileSecretStore::new(settings.secrets_dir.clone());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("termination signal received");
        signal_cancel.cancel();
    });

    match run_provision(&store, &settings, &cancel).await {
        Ok(report) => {
            if report.created {
                println!("✅ Database {} created and configured", report.database);
            } else {
                println!("✅ Database {} configured", report.database);
            }
        }
        // A signal ends the run cleanly: pools are already released.
        Err(e) if e.is_cancelled() => {
            info!("provisioning stopped by termination signal");
        }
        Err(e) => {
            eprintln!("❌ Provisioning failed: {e}");
            std::process::exit(1);
        }
    }
}
