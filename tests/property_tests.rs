//! Property-based tests for canonical lock ordering, result round-trips and
//! retry backoff bounds.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use teamforge_core::locks::{EntityId, LockManager};
use teamforge_core::models::data::{Document, Organization, OrganizationRole, User};
use teamforge_core::models::{Command, CommandAction, CommandResult};
use teamforge_core::runtime::RetryPolicy;

fn entity_strategy() -> impl Strategy<Value = EntityId> {
    (
        prop_oneof![
            Just("organization".to_string()),
            Just("project".to_string()),
            Just("user".to_string()),
            Just("resource".to_string()),
        ],
        "[a-z0-9]{1,8}",
    )
        .prop_map(|(entity_type, key)| EntityId::new(entity_type, key))
}

proptest! {
    #[test]
    fn acquired_lock_sets_are_canonically_ordered(
        entities in prop::collection::vec(entity_strategy(), 1..8)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async {
            let locks = Arc::new(LockManager::new(Duration::from_secs(30)));
            let guard = locks.acquire("wf-prop", &entities).await;

            let held = guard.entities();
            // Sorted and deduplicated regardless of the request order
            prop_assert!(held.windows(2).all(|pair| pair[0] < pair[1]));
            for entity in &entities {
                prop_assert!(held.contains(entity));
            }
            Ok(())
        })?;
    }

    #[test]
    fn retry_delays_are_monotone_and_capped(
        attempts in 1u32..12,
        base_ms in 1u64..500,
        max_ms in 500u64..5_000,
    ) {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
        );

        let mut previous = Duration::ZERO;
        for attempt in 1..=attempts {
            let delay = policy.delay_for(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= Duration::from_millis(max_ms));
            previous = delay;
        }
    }

    #[test]
    fn command_results_round_trip_with_arbitrary_errors(
        warnings in prop::collection::vec("[ -~]{1,40}", 0..4),
        errors in prop::collection::vec("[ -~]{1,40}", 0..4),
    ) {
        let command = Command::new(
            CommandAction::Create,
            Document::Organization(Organization::new("acme", "Acme")),
            User::new("org-1", OrganizationRole::Owner),
        );

        let mut result = command.create_result();
        for warning in &warnings {
            result.push_warning(warning.clone());
        }
        for error in &errors {
            result.push_error(error.clone());
        }
        result.finalize();

        let json = serde_json::to_string(&result).unwrap();
        let decoded: CommandResult = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(decoded.command_id, result.command_id);
        prop_assert_eq!(decoded.runtime_status, result.runtime_status);
        prop_assert_eq!(decoded.errors, result.errors);
    }
}
