//! The generic reconciliation engine
//!
//! One invocation converges a single remote object toward the caller's
//! desired state: resolve the target (by href or natural key), compare it
//! against the desired descriptor using the kind's field tables, and issue
//! at most one mutating call. In dry-run mode no mutating call is made, but
//! the reported `changed` value is exactly what a real run would report.
//!
//! Invocations are independent: no state is shared or cached between runs,
//! and a failed run leaves nothing partially applied.

use tracing::{debug, info, instrument};

use crate::api::ObjectApi;
use crate::resource::{frozen_conflict, matches, Resource};
use crate::{Error, Result};

/// Desired presence of the target object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// The object should exist and match the desired descriptor
    #[default]
    Present,
    /// The object should not exist
    Absent,
}

/// Terminal verdict of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The object already matched the desired state
    Unchanged,
    /// The object was created (or would be, in dry-run mode)
    Created,
    /// The object was updated (or would be, in dry-run mode)
    Updated,
    /// The object was deleted (or would be, in dry-run mode)
    Deleted,
    /// The object was already absent or tombstoned
    AlreadyAbsent,
}

/// One reconciliation request: lookup, intent, desired state, and mode
#[derive(Debug, Clone)]
pub struct ReconcileRequest<R> {
    /// Href of the target object; when set, the object must exist
    pub href: Option<String>,
    /// Desired presence
    pub state: State,
    /// Desired descriptor; also supplies the natural key when no href is
    /// given
    pub desired: R,
    /// When true, no mutating call reaches the engine
    pub dry_run: bool,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileOutcome<R> {
    /// Whether remote state changed (or would change, in dry-run mode)
    pub changed: bool,
    /// Which terminal state the reconciliation reached
    pub verdict: Verdict,
    /// The object reflecting remote state after the operation; `None` when
    /// the target was deleted or never existed
    pub object: Option<R>,
}

impl<R> ReconcileOutcome<R> {
    fn new(verdict: Verdict, changed: bool, object: Option<R>) -> Self {
        Self {
            changed,
            verdict,
            object,
        }
    }
}

/// Reconcile one object toward the desired state.
///
/// Issues at most one mutating call. Every API failure, validation failure,
/// ambiguous lookup, or immutable-field conflict is fatal for the
/// invocation; the caller decides whether to retry.
#[instrument(skip(api, req), fields(kind = R::KIND, dry_run = req.dry_run))]
pub async fn reconcile<R: Resource>(
    api: &dyn ObjectApi<R>,
    req: ReconcileRequest<R>,
) -> Result<ReconcileOutcome<R>> {
    req.desired.validate()?;

    let existing = resolve(api, &req).await?;
    debug!(found = existing.is_some(), "resolved target object");

    match req.state {
        State::Present => converge_present(api, req, existing).await,
        State::Absent => converge_absent(api, req, existing).await,
    }
}

/// Resolve the target object per the lookup key.
///
/// An href names a specific, already-known object, so a missing object is
/// an error. A natural key may legitimately match nothing ("does not exist
/// yet"), but matching more than one object is ambiguous and fatal.
async fn resolve<R: Resource>(
    api: &dyn ObjectApi<R>,
    req: &ReconcileRequest<R>,
) -> Result<Option<R>> {
    if let Some(href) = &req.href {
        return match api.fetch_by_href(href).await? {
            Some(object) => Ok(Some(object)),
            None => Err(Error::not_found(format!("no {} found with href {}", R::KIND, href))),
        };
    }

    let filter = req.desired.natural_key();
    if filter.is_empty() {
        return Err(Error::validation(format!(
            "either an href or the {} natural key fields must be provided",
            R::KIND
        )));
    }

    let mut objects = api.fetch_by_filter(&filter, 2).await?;
    if objects.len() > 1 {
        return Err(Error::AmbiguousLookup {
            kind: R::KIND,
            filter: filter
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        });
    }
    Ok(objects.pop())
}

async fn converge_present<R: Resource>(
    api: &dyn ObjectApi<R>,
    req: ReconcileRequest<R>,
    existing: Option<R>,
) -> Result<ReconcileOutcome<R>> {
    // A tombstoned object is treated as absent: converging means creating
    // a replacement
    let observed = existing.filter(|o| !o.is_deleted());

    let Some(observed) = observed else {
        if req.dry_run {
            info!("would create");
            return Ok(ReconcileOutcome::new(Verdict::Created, true, Some(req.desired)));
        }
        let created = api.create(&req.desired).await?;
        info!(href = created.href().unwrap_or(""), "created");
        return Ok(ReconcileOutcome::new(Verdict::Created, true, Some(created)));
    };

    if matches(&observed, &req.desired) {
        debug!("observed state matches desired state");
        return Ok(ReconcileOutcome::new(Verdict::Unchanged, false, Some(observed)));
    }

    if let Some(field) = frozen_conflict(&observed, &req.desired) {
        return Err(Error::ImmutableField {
            kind: R::KIND,
            field,
        });
    }

    if req.dry_run {
        info!("would update");
        return Ok(ReconcileOutcome::new(Verdict::Updated, true, Some(req.desired)));
    }

    let href = observed
        .href()
        .ok_or_else(|| Error::serialization(format!("observed {} has no href", R::KIND)))?
        .to_string();
    api.update(&href, &req.desired.update_body()?).await?;
    info!(href = %href, "updated");

    // Re-fetch for the authoritative post-update state
    let refreshed = api
        .fetch_by_href(&href)
        .await?
        .ok_or_else(|| Error::not_found(format!("no {} found with href {}", R::KIND, href)))?;
    Ok(ReconcileOutcome::new(Verdict::Updated, true, Some(refreshed)))
}

async fn converge_absent<R: Resource>(
    api: &dyn ObjectApi<R>,
    req: ReconcileRequest<R>,
    existing: Option<R>,
) -> Result<ReconcileOutcome<R>> {
    let observed = existing.filter(|o| !o.is_deleted());

    let Some(observed) = observed else {
        debug!("target already absent");
        return Ok(ReconcileOutcome::new(Verdict::AlreadyAbsent, false, None));
    };

    if req.dry_run {
        info!("would delete");
        return Ok(ReconcileOutcome::new(Verdict::Deleted, true, None));
    }

    let href = observed
        .href()
        .ok_or_else(|| Error::serialization(format!("observed {} has no href", R::KIND)))?;
    api.delete(href).await?;
    info!(href = %href, "deleted");
    Ok(ReconcileOutcome::new(Verdict::Deleted, true, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::object::MockObjectApi;
    use crate::resources::Label;

    /// Desired label as the automation runtime would supply it
    fn desired_label(key: &str, value: &str) -> Label {
        Label::new(Some(key.to_string()), Some(value.to_string()))
    }

    /// Observed label as the engine would return it
    fn remote_label(href: &str, key: &str, value: &str) -> Label {
        Label {
            href: Some(href.to_string()),
            created_at: Some("2022-06-07T00:11:10.923Z".to_string()),
            ..desired_label(key, value)
        }
    }

    fn present_request(desired: Label) -> ReconcileRequest<Label> {
        ReconcileRequest {
            href: None,
            state: State::Present,
            desired,
            dry_run: false,
        }
    }

    fn absent_request(desired: Label) -> ReconcileRequest<Label> {
        ReconcileRequest {
            state: State::Absent,
            ..present_request(desired)
        }
    }

    mod lookup {
        use super::*;

        #[tokio::test]
        async fn explicit_href_must_exist() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_href().returning(|_| Ok(None));

            let req = ReconcileRequest {
                href: Some("/orgs/1/labels/404".to_string()),
                ..present_request(Label::default())
            };
            let err = reconcile(&api, req).await.unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
        }

        #[tokio::test]
        async fn missing_lookup_key_fails_before_any_call() {
            let api = MockObjectApi::<Label>::new();
            let err = reconcile(&api, present_request(Label::default()))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        #[tokio::test]
        async fn duplicate_natural_key_matches_are_ambiguous() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| {
                Ok(vec![
                    remote_label("/orgs/1/labels/1", "env", "Test"),
                    remote_label("/orgs/1/labels/2", "env", "Test"),
                ])
            });

            let err = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::AmbiguousLookup { .. }));
        }

        #[tokio::test]
        async fn natural_key_filter_is_bounded() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .withf(|filter, limit| {
                    filter == [("key", "env".to_string()), ("value", "Test".to_string())]
                        && *limit == 2
                })
                .returning(|_, _| Ok(vec![]));
            api.expect_create()
                .returning(|_| Ok(remote_label("/orgs/1/labels/1500", "env", "Test")));

            let out = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(out.changed);
        }
    }

    mod present_flow {
        use super::*;

        #[tokio::test]
        async fn creates_when_absent() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));
            api.expect_create()
                .withf(|d| d.key.as_deref() == Some("env") && d.value.as_deref() == Some("Test"))
                .returning(|_| Ok(remote_label("/orgs/1/labels/1500", "env", "Test")));

            let out = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Created);
            let object = out.object.unwrap();
            assert_eq!(object.href.as_deref(), Some("/orgs/1/labels/1500"));
            assert_eq!(object.value.as_deref(), Some("Test"));
        }

        #[tokio::test]
        async fn unchanged_when_observed_matches() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));

            let out = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::Unchanged);
            assert_eq!(
                out.object.unwrap().href.as_deref(),
                Some("/orgs/1/labels/1500")
            );
        }

        #[tokio::test]
        async fn updates_only_mutable_fields_and_refetches() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));
            api.expect_update()
                .withf(|href, body| {
                    href == "/orgs/1/labels/1500"
                        && body.get("key").is_none()
                        && body["value"] == "Prod"
                })
                .returning(|_, _| Ok(()));
            api.expect_fetch_by_href()
                .withf(|href| href == "/orgs/1/labels/1500")
                .returning(|_| Ok(Some(remote_label("/orgs/1/labels/1500", "env", "Prod"))));

            let out = reconcile(&api, present_request(desired_label("env", "Prod")))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Updated);
            // authoritative post-update state, same identifier
            let object = out.object.unwrap();
            assert_eq!(object.href.as_deref(), Some("/orgs/1/labels/1500"));
            assert_eq!(object.value.as_deref(), Some("Prod"));
        }

        #[tokio::test]
        async fn href_only_invocation_converges_without_update() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_href()
                .returning(|_| Ok(Some(remote_label("/orgs/1/labels/1500", "env", "Test"))));
            // no update expectation: any update call would panic the mock

            let req = ReconcileRequest {
                href: Some("/orgs/1/labels/1500".to_string()),
                ..present_request(Label::default())
            };
            let out = reconcile(&api, req).await.unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::Unchanged);
        }

        #[tokio::test]
        async fn immutable_field_change_fails_without_update_call() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));
            // no update expectation: any update call would panic the mock

            let err = reconcile(&api, present_request(desired_label("loc", "Test")))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::ImmutableField {
                    kind: "label",
                    field: "key"
                }
            ));
        }

        #[tokio::test]
        async fn tombstoned_object_is_recreated() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| {
                let mut gone = remote_label("/orgs/1/labels/1500", "env", "Test");
                gone.deleted = Some(true);
                Ok(vec![gone])
            });
            api.expect_create()
                .returning(|_| Ok(remote_label("/orgs/1/labels/1501", "env", "Test")));

            let out = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert_eq!(out.verdict, Verdict::Created);
            assert_eq!(
                out.object.unwrap().href.as_deref(),
                Some("/orgs/1/labels/1501")
            );
        }

        #[tokio::test]
        async fn api_failure_propagates() {
            use crate::error::{ApiError, ApiErrorKind};

            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));
            api.expect_create().returning(|_| {
                Err(ApiError::new(
                    ApiErrorKind::Conflict,
                    "failed to create label",
                    "key already in use",
                )
                .into())
            });

            let err = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Api(_)));
        }
    }

    mod absent_flow {
        use super::*;

        #[tokio::test]
        async fn deletes_when_found() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));
            api.expect_delete()
                .withf(|href| href == "/orgs/1/labels/1500")
                .times(1)
                .returning(|_| Ok(()));

            let out = reconcile(&api, absent_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Deleted);
            assert!(out.object.is_none());
        }

        #[tokio::test]
        async fn already_absent_is_not_a_change() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));

            let out = reconcile(&api, absent_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::AlreadyAbsent);
        }

        #[tokio::test]
        async fn tombstoned_object_is_already_absent() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| {
                let mut gone = remote_label("/orgs/1/labels/1500", "env", "Test");
                gone.deleted = Some(true);
                Ok(vec![gone])
            });

            let out = reconcile(&api, absent_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::AlreadyAbsent);
        }
    }

    /// Dry-run behavior: the reported `changed` must equal what a real run
    /// would report, and no mutating call may reach the API. The mocks
    /// below declare no create/update/delete expectations, so any mutating
    /// call panics the test.
    mod dry_run {
        use super::*;

        fn dry(mut req: ReconcileRequest<Label>) -> ReconcileRequest<Label> {
            req.dry_run = true;
            req
        }

        #[tokio::test]
        async fn would_create_reports_changed() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));

            let out = reconcile(&api, dry(present_request(desired_label("env", "Test"))))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Created);
            // the would-be descriptor, not a server-populated object
            assert!(out.object.unwrap().href.is_none());
        }

        #[tokio::test]
        async fn would_update_reports_changed() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));

            let out = reconcile(&api, dry(present_request(desired_label("env", "Prod"))))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Updated);
        }

        #[tokio::test]
        async fn matching_state_reports_unchanged() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));

            let out = reconcile(&api, dry(present_request(desired_label("env", "Test"))))
                .await
                .unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::Unchanged);
        }

        #[tokio::test]
        async fn would_delete_reports_changed() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));

            let out = reconcile(&api, dry(absent_request(desired_label("env", "Test"))))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(out.verdict, Verdict::Deleted);
        }

        #[tokio::test]
        async fn absent_target_reports_unchanged() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));

            let out = reconcile(&api, dry(absent_request(desired_label("env", "Test"))))
                .await
                .unwrap();
            assert!(!out.changed);
            assert_eq!(out.verdict, Verdict::AlreadyAbsent);
        }
    }

    /// The full label walk-through: create, converge, update, delete,
    /// converge again. Each step runs as an independent invocation against
    /// remote state left by the previous one, which is how an automation
    /// runtime drives this engine.
    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn create_then_rerun_is_idempotent() {
            // first run: nothing remote, create
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));
            api.expect_create()
                .times(1)
                .returning(|_| Ok(remote_label("/orgs/1/labels/1500", "env", "Test")));
            let first = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(first.changed);

            // second run: remote state now matches, no mutation
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));
            let second = reconcile(&api, present_request(desired_label("env", "Test")))
                .await
                .unwrap();
            assert!(!second.changed);
            assert_eq!(
                first.object.unwrap().href,
                second.object.unwrap().href,
                "identifier must be stable across converged runs"
            );
        }

        #[tokio::test]
        async fn value_change_updates_in_place() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Test")]));
            api.expect_update()
                .times(1)
                .withf(|_, body| body["value"] == "Prod" && body.get("key").is_none())
                .returning(|_, _| Ok(()));
            api.expect_fetch_by_href()
                .returning(|_| Ok(Some(remote_label("/orgs/1/labels/1500", "env", "Prod"))));

            let out = reconcile(&api, present_request(desired_label("env", "Prod")))
                .await
                .unwrap();
            assert!(out.changed);
            assert_eq!(
                out.object.unwrap().href.as_deref(),
                Some("/orgs/1/labels/1500"),
                "update must not change the identifier"
            );
        }

        #[tokio::test]
        async fn delete_then_rerun_is_idempotent() {
            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter()
                .returning(|_, _| Ok(vec![remote_label("/orgs/1/labels/1500", "env", "Prod")]));
            api.expect_delete().times(1).returning(|_| Ok(()));
            let first = reconcile(&api, absent_request(desired_label("env", "Prod")))
                .await
                .unwrap();
            assert!(first.changed);

            let mut api = MockObjectApi::<Label>::new();
            api.expect_fetch_by_filter().returning(|_, _| Ok(vec![]));
            let second = reconcile(&api, absent_request(desired_label("env", "Prod")))
                .await
                .unwrap();
            assert!(!second.changed);
        }
    }
}
