//! Container cluster command

use clap::Args;

use crate::cli::{ConnectionArgs, StateArg};
use crate::resources::ContainerCluster;
use crate::Result;

/// Arguments for `segmentctl container-cluster`
#[derive(Args, Debug)]
pub struct ContainerClusterArgs {
    /// Href of an existing container cluster
    #[arg(long)]
    pub href: Option<String>,

    /// Cluster display name; required when no href is given
    #[arg(long)]
    pub name: Option<String>,

    /// Cluster description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Desired cluster state
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,
}

/// Reconcile one container cluster.
///
/// The creation result carries a one-time pairing token
/// (`container_cluster_token`) that can never be retrieved again; callers
/// must persist it from the printed document.
pub async fn run(conn: &ConnectionArgs, args: ContainerClusterArgs, dry_run: bool) -> Result<()> {
    let desired = ContainerCluster::new(args.name, args.description);
    super::execute(conn, args.href, args.state, desired, dry_run).await
}
