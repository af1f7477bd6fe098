//! CLI entry point for the polisync coordinator.
//!
//! Write commands read a JSON payload from stdin and write a JSON receipt to
//! stdout. Logs go to stderr.
//!
//! Exit status: 0 on success, 1 for a failure outside the coordinator
//! (bad config, unreachable store, malformed stdin JSON), 2 for a usage
//! error, and 3 to 6 for coordinator errors (see [`exit_status`]).

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use polisync_core::{ClaimInput, ClientInput, ClientPatch, PolicyInput};
use polisync_docstore::DocClient;
use polisync_graph::GraphClient;
use polisync_saga::{Coordinator, ErrorCode, SyncError};

#[derive(Parser)]
#[command(name = "polisync")]
#[command(about = "Keep the document and graph insurance stores in step")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: polisync).
    #[arg(short, long, default_value = "polisync", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create a client (reads JSON from stdin).
    CreateClient,
    /// Create a policy for an existing client and agent (reads JSON from stdin).
    CreatePolicy,
    /// Create a claim against an existing policy (reads JSON from stdin).
    CreateClaim,
    /// Update a client's fields (reads the patch as JSON from stdin).
    UpdateClient {
        /// Client business key.
        #[arg(long)]
        id: String,
    },
    /// Delete a client with its policies and claims.
    DeleteClient {
        /// Client business key.
        #[arg(long)]
        id: String,
    },
    /// Create document indexes and graph constraints.
    InitSchema,
    /// Run a read-only report.
    Report {
        #[arg(value_enum)]
        name: ReportName,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportName {
    ActiveClients,
    ExpiredPolicies,
    TopCoverage,
    OpenClaims,
    AgentPolicies,
    MultiVehicleClients,
    ClientsWithoutPolicies,
    RecentAccidentClaims,
    SuspendedPolicies,
    InsuredVehicles,
    AgentClaims,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = polisync_saga::config::load(&cli.config)?;

    let documents = DocClient::connect(&config.mongo).await?;
    let graph = GraphClient::connect(&config.neo4j).await?;

    match cli.command {
        Command::InitSchema => {
            documents.ensure_indexes().await?;
            graph.ensure_constraints().await?;
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
        Command::Report { name } => run_report(name, &documents, &graph).await?,
        command => {
            let coordinator = Coordinator::new(documents, graph).with_config(config.coordinator);
            run_write(command, &coordinator).await?;
        }
    }

    Ok(())
}

async fn run_write(
    command: Command,
    coordinator: &Coordinator<DocClient, GraphClient>,
) -> anyhow::Result<()> {
    match command {
        Command::CreateClient => {
            let input: ClientInput = read_payload()?;
            emit(coordinator.create_client(input).await)
        }
        Command::CreatePolicy => {
            let input: PolicyInput = read_payload()?;
            emit(coordinator.create_policy(input).await)
        }
        Command::CreateClaim => {
            let input: ClaimInput = read_payload()?;
            emit(coordinator.create_claim(input).await)
        }
        Command::UpdateClient { id } => {
            let patch: ClientPatch = read_payload()?;
            emit(coordinator.update_client(&id, patch).await)
        }
        Command::DeleteClient { id } => emit(coordinator.delete_client(&id).await),
        Command::InitSchema | Command::Report { .. } => {
            anyhow::bail!("Not a write command")
        }
    }
}

async fn run_report(
    name: ReportName,
    documents: &DocClient,
    graph: &GraphClient,
) -> anyhow::Result<()> {
    match name {
        ReportName::ActiveClients => print_json(&documents.active_clients().await?),
        ReportName::ExpiredPolicies => print_json(&documents.expired_policies().await?),
        ReportName::TopCoverage => print_json(&documents.top_clients_by_coverage().await?),
        ReportName::OpenClaims => print_json(&graph.open_claims().await?),
        ReportName::AgentPolicies => print_json(&graph.agent_policy_counts().await?),
        ReportName::MultiVehicleClients => print_json(&graph.multi_vehicle_clients().await?),
        ReportName::ClientsWithoutPolicies => {
            print_json(&documents.clients_without_active_policies().await?)
        }
        ReportName::RecentAccidentClaims => print_json(&documents.recent_accident_claims().await?),
        ReportName::SuspendedPolicies => print_json(&documents.suspended_policies().await?),
        ReportName::InsuredVehicles => print_json(&graph.insured_vehicles().await?),
        ReportName::AgentClaims => print_json(&graph.agent_claim_counts().await?),
    }
}

fn read_payload<T: DeserializeOwned>() -> anyhow::Result<T> {
    let input = std::io::read_to_string(std::io::stdin())?;
    Ok(serde_json::from_str(&input)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print the receipt, or the error body and exit with its status.
fn emit<T: Serialize>(result: Result<T, SyncError>) -> anyhow::Result<()> {
    match result {
        Ok(receipt) => print_json(&receipt),
        Err(e) => {
            let code = e.code();
            print_json(&serde_json::json!({ "error": code, "message": e.to_string() }))?;
            std::process::exit(exit_status(code));
        }
    }
}

/// Process exit status for a coordinator error.
///
/// 1 and 2 stay reserved for `main` returning an error and for clap usage errors.
fn exit_status(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::MissingArguments => 3,
        ErrorCode::NotFound => 4,
        ErrorCode::AlreadyExists => 5,
        ErrorCode::Unexpected => 6,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_statuses_are_distinct_and_clear_of_generic_failures() {
        let codes = [
            ErrorCode::MissingArguments,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::Unexpected,
        ];
        let mut statuses: Vec<i32> = codes.iter().map(|c| exit_status(*c)).collect();
        assert!(statuses.iter().all(|s| *s > 2));
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), codes.len());
    }

    #[test]
    fn report_names_parse() {
        let cli = Cli::try_parse_from(["polisync", "report", "suspended-policies"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Report {
                name: ReportName::SuspendedPolicies
            }
        ));
        assert!(Cli::try_parse_from(["polisync", "report", "ver-polizas-activas"]).is_err());
    }
}
