// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ssl.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::OperatorConfig;
    use crate::crd::SSL;
    use crate::test_support::{certificate_pem, secret, ssl, tls_secret, MemoryStore};
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const NS: &str = "web";
    const NAME: &str = "site";
    const SECRET: &str = "site-tls";
    const DAY: u64 = 86_400;

    fn setup(config: OperatorConfig) -> (Arc<MemoryStore>, Context) {
        let store = Arc::new(MemoryStore::new());
        let ctx = Context::new(store.clone(), config);
        (store, ctx)
    }

    fn ready_condition(store: &MemoryStore) -> Condition {
        let stored: SSL = store.stored_ssl(NS, NAME).unwrap();
        let status = stored.status.unwrap();
        assert_eq!(status.conditions.len(), 1, "{:?}", status.conditions);
        status.conditions[0].clone()
    }

    fn assert_close(actual: Duration, expected_secs: u64) {
        let diff = actual.as_secs().abs_diff(expected_secs);
        assert!(diff <= 5, "expected ~{expected_secs}s, got {actual:?}");
    }

    // ========== Verdict rendering ==========

    #[test]
    fn test_verdict_messages_name_the_secret() {
        assert_eq!(
            Verdict::SecretNotFound.message(NS, SECRET).as_deref(),
            Some("web/site-tls secret is not found")
        );
        assert_eq!(
            Verdict::SecretTypeInvalid {
                secret_type: "Opaque".to_string()
            }
            .message(NS, SECRET)
            .as_deref(),
            Some("web/site-tls secret type is \"Opaque\"")
        );
        assert_eq!(
            Verdict::KeyNotFound.message(NS, SECRET).as_deref(),
            Some("web/site-tls secret doesn't have tls key")
        );
        assert_eq!(
            Verdict::KeyParseError(InspectError::Parse("bad der".to_string()))
                .message(NS, SECRET)
                .as_deref(),
            Some("web/site-tls secret tls key can not parse: failed to parse certificate: bad der")
        );
    }

    #[test]
    fn test_expiry_verdicts_have_no_reason_or_message() {
        let window = ValidityWindow {
            not_before: Utc::now(),
            not_after: Utc::now(),
        };

        for verdict in [Verdict::Ready(window), Verdict::NotReady(window)] {
            let condition = verdict.to_condition(NS, SECRET);
            assert!(condition.reason.is_none());
            assert!(condition.message.is_none());
        }
        assert_eq!(Verdict::Ready(window).status(), ConditionStatus::True);
        assert_eq!(Verdict::NotReady(window).status(), ConditionStatus::False);
    }

    #[test]
    fn test_to_condition_is_ready_type() {
        let condition = Verdict::KeyNotFound.to_condition(NS, SECRET);
        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason.as_deref(), Some("TLSKeyNotFound"));
    }

    // ========== assess_secret() ==========

    #[test]
    fn test_assess_missing_secret() {
        assert_eq!(assess_secret(None, Utc::now()), Verdict::SecretNotFound);
    }

    #[test]
    fn test_assess_secret_without_type() {
        let mut untyped = tls_secret(NS, SECRET, "irrelevant");
        untyped.type_ = None;

        assert_eq!(
            assess_secret(Some(&untyped), Utc::now()),
            Verdict::SecretTypeInvalid {
                secret_type: String::new()
            }
        );
    }

    #[test]
    fn test_assess_type_checked_before_key() {
        let opaque = secret(NS, SECRET, "Opaque", BTreeMap::new());
        assert!(matches!(
            assess_secret(Some(&opaque), Utc::now()),
            Verdict::SecretTypeInvalid { .. }
        ));
    }

    #[test]
    fn test_assess_key_missing() {
        let data = BTreeMap::from([(
            "tls.crt".to_string(),
            ByteString(certificate_pem(-1, 100).into_bytes()),
        )]);
        let only_crt = secret(NS, SECRET, "kubernetes.io/tls", data);

        assert_eq!(
            assess_secret(Some(&only_crt), Utc::now()),
            Verdict::KeyNotFound
        );
    }

    #[test]
    fn test_assess_reads_string_data_when_data_lacks_key() {
        let mut from_string_data = secret(NS, SECRET, "kubernetes.io/tls", BTreeMap::new());
        from_string_data.string_data = Some(BTreeMap::from([(
            "tls.key".to_string(),
            certificate_pem(-1, 100),
        )]));

        assert!(matches!(
            assess_secret(Some(&from_string_data), horizon(Utc::now(), 30)),
            Verdict::Ready(_)
        ));
    }

    #[test]
    fn test_assess_prefers_data_over_string_data() {
        let mut both = tls_secret(NS, SECRET, &certificate_pem(-1, 100));
        both.string_data = Some(BTreeMap::from([(
            "tls.key".to_string(),
            "garbage".to_string(),
        )]));

        assert!(matches!(
            assess_secret(Some(&both), horizon(Utc::now(), 30)),
            Verdict::Ready(_)
        ));
    }

    // ========== reconcile_ssl(): end-to-end scenarios ==========

    #[tokio::test]
    async fn test_certificate_expiring_within_limit_is_not_ready() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-400, 10)));

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert!(matches!(outcome.verdict, Some(Verdict::NotReady(_))));
        assert!(outcome.status_written);
        let condition = ready_condition(&store);
        assert_eq!(condition.status, ConditionStatus::False);
        assert!(condition.reason.is_none());
        assert!(condition.message.is_none());
        assert!(condition.last_transition_time.is_some());
    }

    #[tokio::test]
    async fn test_renewed_certificate_becomes_ready() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-400, 10)));
        reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-400, 100)));
        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert!(matches!(outcome.verdict, Some(Verdict::Ready(_))));
        assert_eq!(ready_condition(&store).status, ConditionStatus::True);
    }

    #[tokio::test]
    async fn test_wrong_secret_type_is_unknown() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(secret(NS, SECRET, "Opaque", BTreeMap::new()));

        reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        let condition = ready_condition(&store);
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason.as_deref(), Some("SecretTypeIsInvalid"));
        assert!(condition.message.unwrap().contains("Opaque"));
    }

    #[tokio::test]
    async fn test_garbage_key_is_unknown() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, "not a pem block"));

        reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        let condition = ready_condition(&store);
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason.as_deref(), Some("TLSKeyCanNotParse"));
        assert!(condition
            .message
            .unwrap()
            .starts_with("web/site-tls secret tls key can not parse: "));
    }

    #[tokio::test]
    async fn test_missing_secret_then_restored() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));

        reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        let missing = ready_condition(&store);
        assert_eq!(missing.status, ConditionStatus::Unknown);
        assert_eq!(missing.reason.as_deref(), Some("SecretIsNotFound"));
        assert_eq!(
            missing.message.as_deref(),
            Some("web/site-tls secret is not found")
        );

        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));
        reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        let restored = ready_condition(&store);
        assert_eq!(restored.status, ConditionStatus::True);
        assert!(restored.reason.is_none());
        assert!(restored.message.is_none());
    }

    #[tokio::test]
    async fn test_deleted_secret_reports_not_found() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));
        reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        store.remove_secret(NS, SECRET);
        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert_eq!(outcome.verdict, Some(Verdict::SecretNotFound));
        assert_eq!(
            ready_condition(&store).reason.as_deref(),
            Some("SecretIsNotFound")
        );
    }

    #[tokio::test]
    async fn test_deleted_ssl_is_silent_success() {
        let (store, ctx) = setup(OperatorConfig::default());

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert_eq!(outcome.verdict, None);
        assert_eq!(outcome.requeue_after, None);
        assert!(!outcome.status_written);
        assert_eq!(store.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_secret_in_other_namespace_is_not_used() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret("other", SECRET, &certificate_pem(-1, 100)));

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert_eq!(outcome.verdict, Some(Verdict::SecretNotFound));
    }

    // ========== reconcile_ssl(): idempotence ==========

    #[tokio::test]
    async fn test_unchanged_state_is_not_rewritten() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));

        let first = reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        let after_first = ready_condition(&store);
        let second = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert!(first.status_written);
        assert!(!second.status_written);
        assert_eq!(store.status_writes(), 1);
        assert_eq!(ready_condition(&store), after_first);
    }

    #[tokio::test]
    async fn test_reason_change_keeps_transition_time() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        let not_found = ready_condition(&store);

        store.insert_secret(secret(NS, SECRET, "Opaque", BTreeMap::new()));
        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        let invalid = ready_condition(&store);

        assert!(outcome.status_written);
        assert_eq!(invalid.reason.as_deref(), Some("SecretTypeIsInvalid"));
        assert_eq!(invalid.last_transition_time, not_found.last_transition_time);
    }

    // ========== reconcile_ssl(): requeue ==========

    #[tokio::test]
    async fn test_requeue_capped_by_scan_interval() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert_eq!(outcome.requeue_after, Some(Duration::from_secs(DAY)));
    }

    #[tokio::test]
    async fn test_requeue_at_expiry_horizon() {
        let config = OperatorConfig {
            scan_interval: Duration::from_secs(365 * DAY),
            ..OperatorConfig::default()
        };
        let (store, ctx) = setup(config);
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert_close(outcome.requeue_after.unwrap(), 70 * DAY);
    }

    #[tokio::test]
    async fn test_requeue_when_certificate_becomes_valid() {
        let config = OperatorConfig {
            scan_interval: Duration::from_secs(365 * DAY),
            ..OperatorConfig::default()
        };
        let (store, ctx) = setup(config);
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(40, 400)));

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert!(matches!(outcome.verdict, Some(Verdict::NotReady(_))));
        assert_close(outcome.requeue_after.unwrap(), 10 * DAY);
    }

    #[tokio::test]
    async fn test_final_states_do_not_requeue() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));

        let missing = reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        assert_eq!(missing.requeue_after, None);

        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-400, 10)));
        let expiring = reconcile_ssl(&ctx, NS, NAME).await.unwrap();
        assert_eq!(expiring.requeue_after, None);
    }

    // ========== reconcile_ssl(): store failures ==========

    #[tokio::test(start_paused = true)]
    async fn test_conflict_is_retried_from_fresh_read() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));
        store.conflict_next_writes(2);

        let outcome = reconcile_ssl(&ctx, NS, NAME).await.unwrap();

        assert!(outcome.status_written);
        assert_eq!(store.status_writes(), 1);
        assert_eq!(ready_condition(&store).status, ConditionStatus::True);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_retries_exhausted() {
        let config = OperatorConfig {
            conflict_retries: 3,
            ..OperatorConfig::default()
        };
        let (store, ctx) = setup(config);
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));
        store.conflict_next_writes(10);

        let err = reconcile_ssl(&ctx, NS, NAME).await.unwrap_err();

        match err {
            ReconcileError::ConflictRetriesExhausted {
                namespace,
                name,
                attempts,
            } => {
                assert_eq!(namespace, NS);
                assert_eq!(name, NAME);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(store.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_secret_read_failure_is_an_error() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.fail_secret_reads(true);

        let err = reconcile_ssl(&ctx, NS, NAME).await.unwrap_err();

        assert!(matches!(err, ReconcileError::GetSecret { .. }), "{err:?}");
        assert!(store.stored_ssl(NS, NAME).unwrap().status.is_none());
    }

    #[tokio::test]
    async fn test_ssl_read_failure_is_a_retryable_error() {
        let (store, ctx) = setup(OperatorConfig::default());
        store.insert_ssl(ssl(NS, NAME, SECRET, 30));
        store.insert_secret(tls_secret(NS, SECRET, &certificate_pem(-1, 100)));
        store.fail_ssl_reads(true);

        let err = reconcile_ssl(&ctx, NS, NAME).await.unwrap_err();

        assert!(matches!(err, ReconcileError::GetSsl { .. }), "{err:?}");
        assert!(err.is_retryable());
        assert_eq!(store.status_writes(), 0);
        assert!(store.stored_ssl(NS, NAME).unwrap().status.is_none());
    }
}
