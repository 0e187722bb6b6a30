//! Pairing key command

use clap::Args;

use crate::api::{EngineClient, HttpObjectApi};
use crate::cli::ConnectionArgs;
use crate::resources::pairing_key::{self, ProfileLookup};
use crate::resources::PairingProfile;
use crate::{Error, Result};

/// Arguments for `segmentctl pairing-key`
#[derive(Args, Debug)]
pub struct PairingKeyArgs {
    /// Href of the pairing profile to mint the key from
    #[arg(long, conflicts_with = "profile_name")]
    pub profile_href: Option<String>,

    /// Name of the pairing profile to mint the key from
    #[arg(long)]
    pub profile_name: Option<String>,
}

/// Generate one pairing key.
///
/// Minting a key is inherently a mutation, so a dry run generates nothing
/// and reports no change.
pub async fn run(conn: &ConnectionArgs, args: PairingKeyArgs, dry_run: bool) -> Result<()> {
    if dry_run {
        return super::print_document(&serde_json::json!({
            "changed": false,
            "pairing_key": "",
        }));
    }

    let lookup = match (args.profile_href, args.profile_name) {
        (Some(href), _) => ProfileLookup::Href(href),
        (None, Some(name)) => ProfileLookup::Name(name),
        (None, None) => {
            return Err(Error::validation(
                "one of --profile-href or --profile-name must be provided",
            ));
        }
    };

    let config = conn.to_config()?;
    let client = EngineClient::connect(&config).await?;
    let api = HttpObjectApi::<PairingProfile>::new(client.clone());
    let key = pairing_key::generate(&client, &api, &lookup).await?;

    super::print_document(&serde_json::json!({
        "changed": true,
        "pairing_key": key,
    }))
}
