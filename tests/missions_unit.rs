use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use inktoons::missions::catalog::{template, Category, MISSION_POOL, REWARD_PATTERNS};
use inktoons::missions::engine::{
    self, ActionPayload, ActionType, ActiveMission, DailyMissions, TrackOutcome, DEBOUNCE_MS,
};

fn active(id: &str) -> ActiveMission {
    let t = template(id).expect("template exists");
    ActiveMission {
        id: t.id.to_string(),
        title: t.title_key.to_string(),
        description: t.desc_key.to_string(),
        reward: t.reward,
        target: t.target,
        tier: t.tier,
        category: t.category,
        progress: 0,
        is_claimed: false,
        swapped: false,
        progress_details: BTreeMap::new(),
    }
}

fn day_with(ids: &[&str]) -> DailyMissions {
    DailyMissions {
        date: "2026-08-24".to_string(),
        list: ids.iter().map(|id| active(id)).collect(),
        last_action_ms: 0,
    }
}

fn track_at(
    state: &mut DailyMissions,
    action: ActionType,
    now_ms: i64,
) -> TrackOutcome {
    engine::track_action(state, action, &ActionPayload::default(), now_ms)
}

#[test]
fn catalog_is_well_formed() {
    assert_eq!(MISSION_POOL.len(), 29);

    let ids: HashSet<&str> = MISSION_POOL.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), MISSION_POOL.len(), "duplicate mission ids");

    for m in MISSION_POOL.iter() {
        assert!(matches!(m.reward, 5 | 10 | 15 | 20 | 25), "{} reward", m.id);
        assert!(m.target >= 1, "{} target", m.id);
    }

    for pattern in REWARD_PATTERNS.iter() {
        assert_eq!(pattern.iter().sum::<i32>(), 60);
    }
}

#[test]
fn daily_set_matches_a_pattern_and_spans_categories() {
    for seed in 0..200u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let daily = engine::generate_daily("2026-08-24", &mut rng);

        assert_eq!(daily.list.len(), 4, "seed {seed}");
        assert_eq!(daily.date, "2026-08-24");

        let ids: HashSet<&str> = daily.list.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), 4, "seed {seed}: duplicate mission in set");

        let mut rewards: Vec<i32> = daily.list.iter().map(|m| m.reward).collect();
        rewards.sort_unstable();
        let matched = REWARD_PATTERNS.iter().any(|p| {
            let mut p = *p;
            p.sort_unstable();
            p.to_vec() == rewards
        });
        assert!(matched, "seed {seed}: rewards {rewards:?} match no pattern");

        let categories: HashSet<Category> = daily.list.iter().map(|m| m.category).collect();
        assert!(categories.len() >= 3, "seed {seed}: only {categories:?}");

        for m in &daily.list {
            assert_eq!(m.progress, 0);
            assert!(!m.is_claimed);
            assert!(!m.swapped);
        }
    }
}

#[test]
fn read_mission_progresses_notifies_once_and_clamps() {
    // pool_9: read 3 chapters for 10 inks.
    let mut day = day_with(&["pool_9", "pool_5", "pool_23", "pool_28"]);
    let mut t = 10_000;

    for step in 1..=2 {
        let outcome = track_at(&mut day, ActionType::ReadChapter, t);
        assert_eq!(outcome, TrackOutcome::Updated { completed: vec![] });
        assert_eq!(day.list[0].progress, step);
        t += 1_000;
    }

    // Third read completes it; completion is reported exactly here.
    let outcome = track_at(&mut day, ActionType::ReadChapter, t);
    match outcome {
        TrackOutcome::Updated { completed } => {
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].id, "pool_9");
            assert_eq!(completed[0].reward, 10);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(day.list[0].progress, 3);

    // Fourth read: clamped, no second completion.
    t += 1_000;
    let outcome = track_at(&mut day, ActionType::ReadChapter, t);
    assert_eq!(outcome, TrackOutcome::NoChange);
    assert_eq!(day.list[0].progress, 3);
}

#[test]
fn one_action_can_advance_several_missions() {
    // pool_2 (read 1) and pool_9 (read 3) both respond to READ_CHAPTER.
    let mut day = day_with(&["pool_2", "pool_9", "pool_5", "pool_28"]);

    let outcome = track_at(&mut day, ActionType::ReadChapter, 10_000);
    match outcome {
        TrackOutcome::Updated { completed } => {
            assert_eq!(completed.len(), 1, "only pool_2 is done");
            assert_eq!(completed[0].id, "pool_2");
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert_eq!(day.list[0].progress, 1);
    assert_eq!(day.list[1].progress, 1);
}

#[test]
fn series_scoped_read_mission_needs_series_id() {
    let mut day = day_with(&["pool_10", "pool_5", "pool_23", "pool_28"]);

    let outcome = track_at(&mut day, ActionType::ReadChapter, 10_000);
    assert_eq!(outcome, TrackOutcome::NoChange);
    assert_eq!(day.list[0].progress, 0);

    let payload = ActionPayload {
        series_id: Some("series-42".to_string()),
    };
    let outcome = engine::track_action(&mut day, ActionType::ReadChapter, &payload, 20_000);
    assert_eq!(outcome, TrackOutcome::Updated { completed: vec![] });
    assert_eq!(day.list[0].progress, 1);
}

#[test]
fn rapid_calls_are_debounced() {
    let mut day = day_with(&["pool_9", "pool_5", "pool_23", "pool_28"]);

    assert!(matches!(
        track_at(&mut day, ActionType::ReadChapter, 10_000),
        TrackOutcome::Updated { .. }
    ));
    // Within the window: dropped entirely, progress effect lost.
    assert_eq!(
        track_at(&mut day, ActionType::ReadChapter, 10_000 + DEBOUNCE_MS - 1),
        TrackOutcome::Debounced
    );
    assert_eq!(day.list[0].progress, 1);

    // At the window edge: accepted.
    assert!(matches!(
        track_at(&mut day, ActionType::ReadChapter, 10_000 + DEBOUNCE_MS),
        TrackOutcome::Updated { .. }
    ));
    assert_eq!(day.list[0].progress, 2);
}

#[test]
fn compound_mission_needs_every_sub_kind() {
    // pool_26: 5 likes AND 5 ratings, target 10.
    let mut day = day_with(&["pool_26", "pool_5", "pool_9", "pool_21"]);
    let mut t = 10_000;

    // Six likes: the sixth is refused by the sub-cap, not the target.
    for _ in 0..6 {
        track_at(&mut day, ActionType::LikeChapter, t);
        t += 1_000;
    }
    assert_eq!(day.list[0].progress, 5, "likes alone must not complete");
    assert_eq!(day.list[0].progress_details.get("likes"), Some(&5));
    assert!(!day.list[0].is_complete());

    // Five ratings finish it.
    for i in 0..5 {
        let outcome = track_at(&mut day, ActionType::RateSeries, t);
        t += 1_000;
        if i == 4 {
            match outcome {
                TrackOutcome::Updated { completed } => {
                    assert!(completed.iter().any(|c| c.id == "pool_26"));
                }
                other => panic!("expected completion, got {other:?}"),
            }
        }
    }
    assert_eq!(day.list[0].progress, 10);
    assert_eq!(day.list[0].progress_details.get("ratings"), Some(&5));
}

#[test]
fn compound_mission_sub_caps_are_independent() {
    // pool_22: 3 follows AND 1 comment, target 4.
    let mut day = day_with(&["pool_22", "pool_2", "pool_12", "pool_24"]);
    let mut t = 10_000;

    for _ in 0..4 {
        track_at(&mut day, ActionType::FollowAuthor, t);
        t += 1_000;
    }
    assert_eq!(day.list[0].progress, 3, "follow cap is 3");

    track_at(&mut day, ActionType::Comment, t);
    t += 1_000;
    assert_eq!(day.list[0].progress, 4);
    assert!(day.list[0].is_complete());

    // Second comment after completion changes nothing.
    let outcome = track_at(&mut day, ActionType::Comment, t);
    assert_eq!(outcome, TrackOutcome::NoChange);
    assert_eq!(day.list[0].progress, 4);
}

#[test]
fn claim_pays_once_then_refuses() {
    let mut day = day_with(&["pool_2", "pool_9", "pool_5", "pool_28"]);
    track_at(&mut day, ActionType::ReadChapter, 10_000);
    assert!(day.list[0].is_complete());

    let first = engine::claim(&mut day, "pool_2");
    assert!(first.success);
    assert_eq!(first.reward, 5);
    assert!(day.list[0].is_claimed);

    let second = engine::claim(&mut day, "pool_2");
    assert!(!second.success);
    assert_eq!(second.reward, 0);

    // Incomplete mission: refused.
    let incomplete = engine::claim(&mut day, "pool_9");
    assert!(!incomplete.success);

    // Unknown id: refused.
    let unknown = engine::claim(&mut day, "pool_999");
    assert!(!unknown.success);
}

#[test]
fn claimed_mission_ignores_further_actions() {
    let mut day = day_with(&["pool_2", "pool_5", "pool_23", "pool_28"]);
    track_at(&mut day, ActionType::ReadChapter, 10_000);
    engine::claim(&mut day, "pool_2");

    let outcome = track_at(&mut day, ActionType::ReadChapter, 20_000);
    assert_eq!(outcome, TrackOutcome::NoChange);
    assert_eq!(day.list[0].progress, 1);
}

#[test]
fn swap_is_same_category_once_per_slot() {
    let mut day = day_with(&["pool_9", "pool_5", "pool_23", "pool_28"]);
    let original_category = day.list[0].category;
    let mut rng = StdRng::seed_from_u64(7);

    assert!(engine::replace(&mut day, "pool_9", &mut rng));
    let fresh = &day.list[0];
    assert_ne!(fresh.id, "pool_9");
    assert_eq!(fresh.category, original_category);
    assert_eq!(fresh.progress, 0);
    assert!(fresh.swapped);
    let others: HashSet<&str> = day.list[1..].iter().map(|m| m.id.as_str()).collect();
    assert!(!others.contains(fresh.id.as_str()), "swap drew a duplicate");

    // One reroll per slot per day.
    let swapped_id = day.list[0].id.clone();
    assert!(!engine::replace(&mut day, &swapped_id, &mut rng));
}

#[test]
fn completed_or_claimed_missions_cannot_be_swapped() {
    let mut day = day_with(&["pool_2", "pool_9", "pool_5", "pool_28"]);
    track_at(&mut day, ActionType::ReadChapter, 10_000);
    let mut rng = StdRng::seed_from_u64(7);

    // pool_2 is complete.
    assert!(!engine::replace(&mut day, "pool_2", &mut rng));

    engine::claim(&mut day, "pool_2");
    assert!(!engine::replace(&mut day, "pool_2", &mut rng));
}

#[test]
fn stored_state_is_rejected_across_days() {
    let day = day_with(&["pool_2", "pool_9", "pool_5", "pool_28"]);
    let blob = serde_json::to_value(&day).unwrap();

    assert!(engine::from_stored(&blob, "2026-08-24").is_some());
    assert!(engine::from_stored(&blob, "2026-08-25").is_none());
    assert!(engine::from_stored(&serde_json::json!({"garbage": true}), "2026-08-24").is_none());
}

#[test]
fn state_round_trips_through_json() {
    let mut day = day_with(&["pool_26", "pool_5", "pool_9", "pool_21"]);
    track_at(&mut day, ActionType::LikeChapter, 10_000);

    let blob = serde_json::to_value(&day).unwrap();
    let restored: DailyMissions = serde_json::from_value(blob).unwrap();
    assert_eq!(restored.list[0].progress, 1);
    assert_eq!(restored.list[0].progress_details.get("likes"), Some(&1));
    assert_eq!(restored.last_action_ms, 10_000);
}
