//! Pairing key generation
//!
//! Pairing keys are minted server-side from an existing pairing profile and
//! returned exactly once. Unlike the other kinds there is no desired state
//! to converge on: a successful invocation always reports a change, and a
//! dry run generates nothing.

use tracing::info;

use crate::api::{EngineClient, ObjectApi};
use crate::resources::PairingProfile;
use crate::{Error, Result};

/// How to locate the pairing profile that mints the key
#[derive(Debug, Clone)]
pub enum ProfileLookup {
    /// Href of an existing pairing profile
    Href(String),
    /// Display name of an existing pairing profile
    Name(String),
}

/// Resolve a profile lookup to an href.
///
/// A name that matches no profile is fatal (a key cannot be minted from
/// nothing), and a name matching more than one profile is ambiguous.
pub async fn resolve_profile_href(
    api: &dyn ObjectApi<PairingProfile>,
    lookup: &ProfileLookup,
) -> Result<String> {
    match lookup {
        ProfileLookup::Href(href) => Ok(href.clone()),
        ProfileLookup::Name(name) => {
            let filter = [("name", name.clone())];
            let mut profiles = api.fetch_by_filter(&filter, 2).await?;
            if profiles.len() > 1 {
                return Err(Error::AmbiguousLookup {
                    kind: "pairing profile",
                    filter: format!("name={name}"),
                });
            }
            let profile = profiles
                .pop()
                .ok_or_else(|| Error::not_found(format!("no pairing profile named '{name}'")))?;
            profile
                .href
                .ok_or_else(|| Error::serialization("pairing profile has no href".to_string()))
        }
    }
}

/// Mint a pairing key from the profile identified by `lookup`
pub async fn generate(
    client: &EngineClient,
    api: &dyn ObjectApi<PairingProfile>,
    lookup: &ProfileLookup,
) -> Result<String> {
    let href = resolve_profile_href(api, lookup).await?;
    let key = client.generate_pairing_key(&href).await?;
    info!(profile = %href, "pairing key generated");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::object::MockObjectApi;

    fn profile_with_href(href: &str) -> PairingProfile {
        PairingProfile {
            href: Some(href.to_string()),
            ..PairingProfile::named("PP-DB")
        }
    }

    #[tokio::test]
    async fn href_lookup_passes_through() {
        let api = MockObjectApi::<PairingProfile>::new();
        let lookup = ProfileLookup::Href("/orgs/1/pairing_profiles/1".to_string());
        let href = resolve_profile_href(&api, &lookup).await.unwrap();
        assert_eq!(href, "/orgs/1/pairing_profiles/1");
    }

    #[tokio::test]
    async fn name_lookup_resolves_single_match() {
        let mut api = MockObjectApi::<PairingProfile>::new();
        api.expect_fetch_by_filter()
            .withf(|filter, limit| filter == [("name", "PP-DB".to_string())] && *limit == 2)
            .returning(|_, _| Ok(vec![profile_with_href("/orgs/1/pairing_profiles/7")]));

        let lookup = ProfileLookup::Name("PP-DB".to_string());
        let href = resolve_profile_href(&api, &lookup).await.unwrap();
        assert_eq!(href, "/orgs/1/pairing_profiles/7");
    }

    #[tokio::test]
    async fn missing_profile_is_fatal() {
        let mut api = MockObjectApi::<PairingProfile>::new();
        api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));

        let lookup = ProfileLookup::Name("PP-MISSING".to_string());
        let err = resolve_profile_href(&api, &lookup).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_names_are_ambiguous() {
        let mut api = MockObjectApi::<PairingProfile>::new();
        api.expect_fetch_by_filter().returning(|_, _| {
            Ok(vec![
                profile_with_href("/orgs/1/pairing_profiles/1"),
                profile_with_href("/orgs/1/pairing_profiles/2"),
            ])
        });

        let lookup = ProfileLookup::Name("PP".to_string());
        let err = resolve_profile_href(&api, &lookup).await.unwrap_err();
        assert!(matches!(err, Error::AmbiguousLookup { .. }));
    }
}
