use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sonde::api::{self, ApiConfig, ApiState};
use sonde::config::Config;
use sonde::controller::{Announcement, ControllerClient};
use sonde::probes::Dispatcher;
use sonde::queue::TaskQueue;
use sonde::scheduler::{Archive, Poller};

#[derive(Parser)]
#[command(name = "sonde", about = "Distributed-monitoring poller agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the poller agent.
    Run {
        /// Path to the JSON config file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Parse a config file and report whether it is valid.
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sonde=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { config } => run(Config::from_file(&config)?).await,
        Command::Validate { config } => {
            let parsed = Config::from_file(&config)?;
            println!("{} is valid", config.display());
            println!(
                "listen {}:{}, controller {}",
                parsed.listen.host,
                parsed.listen.port,
                match &parsed.controller {
                    Some(c) => format!("{}:{}", c.host, c.port),
                    None => "none (standalone)".to_string(),
                }
            );
            Ok(())
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(TaskQueue::new());
    let archive = Arc::new(Archive::new(config.scheduler.archive_capacity));

    let dispatcher = Dispatcher::new(config.scheduler.dispatch_timeout())?
        .with_snmp(config.snmp.settings())
        .with_ssh(config.ssh.settings());

    let poller = Poller::new(Arc::clone(&queue), Arc::new(dispatcher))
        .with_archive(Arc::clone(&archive))
        .with_tick_interval(config.scheduler.tick_interval())
        .with_max_in_flight(config.scheduler.max_in_flight)
        .with_dispatch_timeout(config.scheduler.dispatch_timeout());

    let (handle, scheduler_task) = poller.start();
    tracing::info!("scheduler started");

    if let Some(controller) = &config.controller {
        let client = ControllerClient::new(
            &controller.host,
            controller.port,
            Announcement {
                name: controller.name.clone(),
                ip: config.listen.host.clone(),
                port: config.listen.port,
            },
        )?
        .with_keepalive_interval(Duration::from_secs(controller.keepalive_secs));

        match client.register().await {
            Ok(()) => tracing::info!(
                controller = %format!("{}:{}", controller.host, controller.port),
                "registered with controller"
            ),
            Err(e) => tracing::warn!(error = %e, "controller registration failed, continuing"),
        }
        tokio::spawn(client.run());
    }

    let state = ApiState {
        queue,
        archive,
        handle: handle.clone(),
    };
    let server = api::start_server(
        ApiConfig::new(config.listen.host.clone(), config.listen.port),
        state,
    )
    .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    handle.shutdown().await?;
    scheduler_task.await?;
    server.abort();

    Ok(())
}
