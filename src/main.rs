use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use refine_daemon::{
    daemon_ipc::{loopback, DaemonServer, RemoteFacade, ANY_FREE_PORT},
    CallResult, CompilationConfiguration, ConfigurationResult, Error, HandlerRegistry,
    LocalFacade, RefinementContext, RefinementFacade, ResultWithDiagnostics, ScriptSource,
    StageKey, TransportError,
};

#[derive(Parser)]
#[command(name = "refine-daemon")]
#[command(about = "Loopback daemon running script-configuration refinement chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the refinement daemon on a loopback port
    Serve {
        /// Port to bind on 127.0.0.1; 0 picks any free port
        #[arg(long, default_value_t = ANY_FREE_PORT)]
        port: u16,
    },
    /// Send one refinement request to a running daemon
    Refine {
        /// Port the daemon listens on
        #[arg(long)]
        port: u16,
        /// Stage key: beforeParsing, onAnnotations or beforeCompiling
        #[arg(long)]
        stage: String,
        /// Script file providing the source text for the context
        #[arg(long)]
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("refine_daemon=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Refine {
            port,
            stage,
            script,
        } => refine(port, stage, script).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn serve(port: u16) -> refine_daemon::Result<()> {
    // An embedding registers its handler chains here; a bare daemon passes
    // every configuration through unchanged.
    let registry = Arc::new(HandlerRegistry::new());
    let facade = Arc::new(LocalFacade::new(registry));
    let server = DaemonServer::bind(port, facade).await?;
    println!("listening on {}", server.local_addr()?);
    let shutdown = server.shutdown_handle();

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, draining");
            shutdown.shutdown();
            Ok(())
        }
    }
}

async fn refine(port: u16, stage: String, script: PathBuf) -> refine_daemon::Result<()> {
    let text = tokio::fs::read_to_string(&script).await?;
    let name = script
        .file_name()
        .map_or_else(|| "script".to_string(), |n| n.to_string_lossy().into_owned());
    let context = RefinementContext::new(CompilationConfiguration::new(), ScriptSource::new(name, text));
    let stage = StageKey::new(stage);
    let addr = loopback(port);

    // The remote handle is blocking; keep it off the runtime workers.
    let outcome = tokio::task::spawn_blocking(move || -> refine_daemon::Result<ConfigurationResult> {
        match RemoteFacade::connect(addr)? {
            CallResult::Good(facade) => facade.refine(stage, context),
            CallResult::Ok => Err(Error::Transport(TransportError::RemoteFault(
                "daemon answered the handshake with no session".into(),
            ))),
            CallResult::Dying => Err(Error::Transport(TransportError::RemoteFault(
                "daemon is shutting down".into(),
            ))),
            CallResult::Error(message) => Err(Error::Transport(TransportError::RemoteFault(message))),
        }
    })
    .await
    .map_err(|e| Error::Transport(TransportError::RemoteFault(format!("refine task failed: {e}"))))??;

    match outcome {
        ResultWithDiagnostics::Success { value, reports } => {
            for report in reports {
                eprintln!("{report}");
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        ResultWithDiagnostics::Failure { reports } => {
            for report in reports {
                eprintln!("{report}");
            }
            eprintln!("refinement failed");
            std::process::exit(1);
        }
    }
}
