//! # Property-Based Tests
//!
//! Invariants of the record engine checked over generated input.

use carelink_core::primitives::MIN_HASH_ITERATIONS;
use carelink_core::{
    ActingIdentity, AlertStatus, AuthService, ConditionItem, DailyTip, EntityKind, EntityStore,
    Identity, MutationEngine, MutationRules, NewConditionItem, NewDailyTip, NewEmergencyAlert,
    NewMedicalCondition, PasswordHasher, QueryEngine, RecordId, Role, TokenSigner, rank,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn auth() -> AuthService {
    AuthService::new(
        PasswordHasher::new(MIN_HASH_ITERATIONS).expect("hasher"),
        TokenSigner::new("property-secret", 3600).expect("signer"),
    )
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Nurse), Just(Role::Patient)]
}

fn status_strategy() -> impl Strategy<Value = AlertStatus> {
    prop_oneof![
        Just(AlertStatus::Pending),
        Just(AlertStatus::Acknowledged),
        Just(AlertStatus::Resolved),
    ]
}

fn out_of_range() -> impl Strategy<Value = f64> {
    prop_oneof![
        (1.000_001f64..1e9),
        (-1e9f64..-0.000_001),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A token issued for an identity verifies to that identity before expiry.
    #[test]
    fn token_round_trips(id in "[a-f0-9]{1,32}", role in role_strategy(), now in 0i64..4_000_000_000) {
        let signer = TokenSigner::new("property-secret", 3600).expect("signer");
        let identity = Identity { user_id: RecordId::new(id), role };

        let token = signer.issue_at(&identity, now).expect("issue");

        prop_assert_eq!(signer.verify_at(&token, now).expect("verify"), identity.clone());
        prop_assert_eq!(signer.verify_at(&token, now + 3599).expect("verify"), identity);
        prop_assert!(signer.verify_at(&token, now + 3600).is_err());
    }

    /// Any probability outside [0, 1] is rejected and nothing is stored.
    #[test]
    fn bad_probability_stores_nothing(p in out_of_range(), good in 0.0f64..=1.0) {
        let mut store = EntityStore::in_memory();
        let auth = auth();
        let rules = MutationRules::default();
        let acting = ActingIdentity::Anonymous;

        let result = MutationEngine::new(&mut store, &auth, &rules, &acting)
            .add_medical_condition(NewMedicalCondition {
                patient_id: "p1".to_string(),
                nurse_id: "n1".to_string(),
                conditions: vec![
                    NewConditionItem { name: "Good".to_string(), probability: good, recommend_consultation: false },
                    NewConditionItem { name: "Bad".to_string(), probability: p, recommend_consultation: true },
                ],
                based_on_symptoms: None,
                notes: None,
            });

        prop_assert!(result.is_err());
        prop_assert_eq!(store.count(EntityKind::MedicalCondition).expect("count"), 0);
    }

    /// Lists come back in reverse insertion order.
    #[test]
    fn lists_are_newest_first(contents in vec("[a-z]{1,12}", 1..30)) {
        let mut store = EntityStore::in_memory();
        let auth = auth();
        let rules = MutationRules::default();
        let acting = ActingIdentity::Anonymous;

        let mut inserted = Vec::new();
        for content in &contents {
            let tip = MutationEngine::new(&mut store, &auth, &rules, &acting)
                .add_daily_tip(NewDailyTip {
                    nurse_id: "n1".to_string(),
                    patient_id: "p1".to_string(),
                    content: content.clone(),
                })
                .expect("tip");
            inserted.push(tip.id);
        }
        inserted.reverse();

        let listed: Vec<RecordId> = QueryEngine::new(&store)
            .list::<DailyTip>(Some("p1"))
            .expect("list")
            .into_iter()
            .map(|t| t.id)
            .collect();
        prop_assert_eq!(listed, inserted);
    }

    /// resolvedAt is present exactly when the alert has been resolved at
    /// least once, whatever happened afterwards.
    #[test]
    fn resolved_at_tracks_resolution(statuses in vec(status_strategy(), 1..12)) {
        let mut store = EntityStore::in_memory();
        let auth = auth();
        let rules = MutationRules::default();
        let acting = ActingIdentity::Anonymous;

        let alert = MutationEngine::new(&mut store, &auth, &rules, &acting)
            .create_emergency_alert(NewEmergencyAlert {
                patient_id: "p1".to_string(),
                message: "help".to_string(),
                location: None,
            })
            .expect("alert");

        let mut ever_resolved = false;
        for status in statuses {
            let before = QueryEngine::new(&store)
                .by_id::<carelink_core::EmergencyAlert>(&alert.id)
                .expect("get")
                .expect("present");
            let after = MutationEngine::new(&mut store, &auth, &rules, &acting)
                .update_alert_status(&alert.id, status.as_str())
                .expect("update")
                .expect("present");

            ever_resolved |= status == AlertStatus::Resolved;
            prop_assert_eq!(after.status, status);
            prop_assert_eq!(after.resolved_at.is_some(), ever_resolved);
            if status != AlertStatus::Resolved {
                prop_assert_eq!(after.resolved_at, before.resolved_at);
            }
        }
    }

    /// Ranking keeps every item and orders them by probability, highest first.
    #[test]
    fn rank_is_sorted_permutation(probs in vec(0.0f64..=1.0, 0..20)) {
        let items: Vec<ConditionItem> = probs
            .iter()
            .enumerate()
            .map(|(i, p)| ConditionItem::new(format!("c{i}"), *p, false))
            .collect();

        let ranked = rank(items.clone()).expect("rank");

        prop_assert_eq!(ranked.len(), items.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].probability >= pair[1].probability);
        }
        for item in &items {
            prop_assert!(ranked.contains(item));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A stored hash verifies its own password and no other.
    #[test]
    fn password_hash_verifies_only_its_password(password in ".{1,40}", other in ".{1,40}") {
        let hasher = PasswordHasher::new(MIN_HASH_ITERATIONS).expect("hasher");
        let stored = hasher.hash(&password);

        prop_assert!(hasher.verify(&password, &stored));
        if other != password {
            prop_assert!(!hasher.verify(&other, &stored));
        }
    }
}
