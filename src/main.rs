use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use convoy::agents::echo::EchoAgent;
use convoy::agents::AgentRegistry;
use convoy::engine::WorkflowExecutor;
use convoy::issuer::{CredentialIssuer, VaultIssuer};
use convoy::leases::LeaseManager;
use convoy::types::Workflow;
use convoy::Config;

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Dependency-aware agent task orchestration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file against the configured agents
    Run {
        #[arg(help = "Path to a workflow YAML file")]
        workflow: PathBuf,
    },
    /// Mint a credential lease and keep it renewed until interrupted
    Lease,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { workflow } => run_workflow(&workflow).await?,
        Commands::Lease => hold_lease().await?,
    }

    Ok(())
}

async fn run_workflow(path: &Path) -> Result<()> {
    let workflow = Workflow::from_file(path)?;

    let mut registry = AgentRegistry::new();
    for name in ["aws", "vault", "mcp", "github"] {
        registry.register(name, Arc::new(EchoAgent::new(name)));
    }

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let report = executor.execute(&workflow.name, &workflow.steps).await?;

    println!(
        "Workflow '{}' {}: {}/{} steps completed, {} failed, {} waves",
        report.workflow,
        if report.success { "succeeded" } else { "failed" },
        report.completed_steps,
        report.total_steps,
        report.failed_steps,
        report.waves_executed
    );

    for (idx, result) in report.results.iter().enumerate() {
        match &result.error {
            Some(error) => println!("  [{idx}] {} error: {}", result.agent, error),
            None => println!("  [{idx}] {} ok: {}", result.agent, result.output),
        }
    }

    Ok(())
}

async fn hold_lease() -> Result<()> {
    let config = Config::from_env();
    let issuer = Arc::new(VaultIssuer::from_config(&config));
    let manager = LeaseManager::new(issuer.clone(), &config);

    manager
        .start(Some(Arc::new(|lease_id: &str| {
            println!("Lease expired: {lease_id}");
        })))
        .await;

    let issued = issuer.issue().await?;
    println!(
        "Issued lease {} (duration {}s, renewable={})",
        issued.lease_id, issued.lease_duration, issued.renewable
    );
    manager.register_lease(&issued.lease_id, issued.lease_duration, issued.renewable);

    tokio::signal::ctrl_c().await?;
    println!("Shutting down, revoking leases");
    manager.stop().await;

    Ok(())
}
