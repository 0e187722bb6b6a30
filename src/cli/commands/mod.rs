//! Subcommand implementations, one per resource kind
//!
//! Each command builds a desired descriptor from its flags, runs the
//! reconciler against an HTTP-backed object API, and prints the result
//! document to stdout.

pub mod container_cluster;
pub mod label;
pub mod pairing_key;
pub mod pairing_profile;

use crate::api::{EngineClient, HttpObjectApi};
use crate::cli::{ConnectionArgs, StateArg};
use crate::reconcile::{reconcile, ReconcileOutcome, ReconcileRequest};
use crate::resource::Resource;
use crate::{Error, Result};

/// Connect, reconcile one object, and print the result document
pub(crate) async fn execute<R: Resource>(
    conn: &ConnectionArgs,
    href: Option<String>,
    state: StateArg,
    desired: R,
    dry_run: bool,
) -> Result<()> {
    let config = conn.to_config()?;
    let client = EngineClient::connect(&config).await?;
    let api = HttpObjectApi::<R>::new(client);
    let outcome = reconcile(
        &api,
        ReconcileRequest {
            href,
            state: state.into(),
            desired,
            dry_run,
        },
    )
    .await?;
    print_outcome::<R>(outcome)
}

/// Print `{"changed": bool, "<kind>": {...}}` to stdout.
///
/// A deleted or never-existing target is reported as an empty object, per
/// the invocation contract.
fn print_outcome<R: Resource>(outcome: ReconcileOutcome<R>) -> Result<()> {
    let object = match outcome.object {
        Some(o) => serde_json::to_value(o).map_err(|e| Error::serialization(e.to_string()))?,
        None => serde_json::json!({}),
    };
    let key = R::KIND.replace(' ', "_");
    let doc = serde_json::json!({ "changed": outcome.changed, key: object });
    print_document(&doc)
}

pub(crate) fn print_document(doc: &serde_json::Value) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(doc).map_err(|e| Error::serialization(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
