//! Feed ranking, anti-repeat and bias learning through the matching engine.

use std::collections::HashSet;
use std::sync::Arc;

use assessor_core::matching::calculate_compatibility;
use assessor_core::profile::{upsert_domain_signals, CoreProfileUpdate, DomainSignal, RawBigFive};
use assessor_core::{
    Domain, InteractionType, ManualClock, MatchingEngine, SafeStore, SqliteProfileStore, UserId,
};
use chrono::{TimeZone, Utc};

fn setup() -> (SafeStore, MatchingEngine) {
    let store = SafeStore::new(Arc::new(SqliteProfileStore::in_memory().unwrap()));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
    ));
    (store.clone(), MatchingEngine::new(store, clock))
}

fn activate(store: &SafeStore, user_id: UserId, domains: &[Domain]) {
    store.ensure_core(user_id);
    let states = store.get_domains(user_id);
    let updated: Vec<_> = domains
        .iter()
        .map(|domain| {
            let signal = DomainSignal {
                reason: format!("keyword: {}", domain),
                weight: 0.6,
                last_seen_at: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            };
            upsert_domain_signals(&states[domain], &[signal], None)
        })
        .collect();
    store.upsert_domain_states(user_id, &updated);
}

fn set_traits(store: &SafeStore, user_id: UserId, scores: [f64; 5]) {
    let update = CoreProfileUpdate {
        big_five: Some(RawBigFive {
            openness: scores[0],
            conscientiousness: scores[1],
            extraversion: scores[2],
            agreeableness: scores[3],
            neuroticism: scores[4],
        }),
        ..CoreProfileUpdate::default()
    };
    store.update_core(user_id, &update);
}

#[test]
fn test_second_call_never_repeats_candidates() {
    let (store, engine) = setup();
    for user_id in 1..=6 {
        store.ensure_core(user_id);
    }
    let candidates: Vec<UserId> = (1..=6).collect();

    let first = engine.suggest_matches(1, &candidates, Some(3));
    let second = engine.suggest_matches(1, &candidates, Some(3));
    let third = engine.suggest_matches(1, &candidates, Some(3));

    let first_ids: HashSet<UserId> = first.iter().map(|s| s.user_id).collect();
    assert_eq!(first_ids.len(), 3);
    assert!(!first_ids.contains(&1));
    assert!(second.iter().all(|s| !first_ids.contains(&s.user_id)));
    assert_eq!(second.len(), 2);
    assert!(third.is_empty());
}

#[test]
fn test_like_never_lowers_a_lookalike() {
    let (store, engine) = setup();
    activate(&store, 1, &[Domain::Career]);
    activate(&store, 2, &[Domain::Career, Domain::Learning]);
    activate(&store, 3, &[Domain::Career, Domain::Learning]);

    let before = engine.calculate_pair_compatibility(1, 3).result.score;
    let liked = engine.build_profile(2);
    engine.record_interaction(1, &liked, InteractionType::Like, None);

    let after = engine.suggest_matches(1, &[3], None);
    assert_eq!(after.len(), 1);
    assert!(after[0].score >= before);
    assert!(engine.bias(1).preferred_domains[&Domain::Learning] > 0.0);
}

#[test]
fn test_pass_weakens_the_tally() {
    let (store, engine) = setup();
    activate(&store, 2, &[Domain::Finance]);
    let passed = engine.build_profile(2);

    engine.record_interaction(1, &passed, InteractionType::Pass, Some(40));
    assert_eq!(engine.bias(1).preferred_domains[&Domain::Finance], -0.5);
    assert_eq!(engine.interactions(1)[0].compatibility, Some(40));
}

#[test]
fn test_big_five_subscore_is_symmetric() {
    let (store, engine) = setup();
    set_traits(&store, 1, [90.0, 12.4, 40.0, 150.0, -3.0]);
    set_traits(&store, 2, [20.0, 70.0, 55.5, 35.0, 88.0]);

    let a = engine.build_profile(1);
    let b = engine.build_profile(2);
    let forward = calculate_compatibility(&a, &b, None);
    let backward = calculate_compatibility(&b, &a, None);
    assert_eq!(forward.breakdown.big_five, backward.breakdown.big_five);
    assert!(a.core.big_five.as_array().iter().all(|v| *v <= 100));
}

#[test]
fn test_feed_cards_prefer_real_users() {
    let (store, engine) = setup();
    for user_id in [1, 2] {
        store.ensure_core(user_id);
    }
    let cards = engine.feed_cards(1, 5);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, 2);

    // the only real candidate is now seen, so seeds take over
    let fallback = engine.feed_cards(1, 5);
    let names: Vec<&str> = fallback.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"Lia"));
    assert_eq!(fallback.len(), 5);
}
