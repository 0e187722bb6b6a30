//! Label command

use clap::Args;

use crate::cli::{ConnectionArgs, StateArg};
use crate::resources::Label;
use crate::Result;

/// Arguments for `segmentctl label`
#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Href of an existing label
    #[arg(long)]
    pub href: Option<String>,

    /// Label dimension key; required with --value when no href is given
    #[arg(long)]
    pub key: Option<String>,

    /// Label value; required with --key when no href is given
    #[arg(long)]
    pub value: Option<String>,

    /// Desired label state
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,

    /// External data set identifier; requires --external-data-reference
    #[arg(long)]
    pub external_data_set: Option<String>,

    /// External data reference identifier; requires --external-data-set
    #[arg(long)]
    pub external_data_reference: Option<String>,
}

/// Reconcile one label
pub async fn run(conn: &ConnectionArgs, args: LabelArgs, dry_run: bool) -> Result<()> {
    let desired = Label {
        key: args.key,
        value: args.value,
        external_data_set: args.external_data_set,
        external_data_reference: args.external_data_reference,
        ..Default::default()
    };
    super::execute(conn, args.href, args.state, desired, dry_run).await
}
