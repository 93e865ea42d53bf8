// src/missions/engine.rs
//
// Daily mission selection and the progress reducer. Everything here is pure
// over explicit state, a clock value and an injected RNG; persistence and
// notification delivery live in the API layer.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;

use super::catalog::{Category, MissionTemplate, Tier, MISSION_POOL, REWARD_PATTERNS};

/// Track calls closer together than this are dropped outright.
pub const DEBOUNCE_MS: i64 = 500;

const SELECTION_ATTEMPTS: u32 = 10;
const MIN_CATEGORIES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveMission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: i32,
    pub target: u32,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub category: Category,
    pub progress: u32,
    #[serde(rename = "isClaimed")]
    pub is_claimed: bool,
    #[serde(default)]
    pub swapped: bool,
    #[serde(rename = "progressDetails", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub progress_details: BTreeMap<String, u32>,
}

impl ActiveMission {
    fn from_template(t: &MissionTemplate) -> Self {
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

    pub fn is_complete(&self) -> bool {
        self.progress >= self.target
    }
}

/// One calendar day's mission set, keyed by the UTC date string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMissions {
    pub date: String,
    pub list: Vec<ActiveMission>,
    #[serde(rename = "lastActionMs", default)]
    pub last_action_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    ReadChapter,
    ViewSeriesDetails,
    SearchUsed,
    FilterGenre,
    VisitProfile,
    LoginToday,
    LikeChapter,
    FollowAuthor,
    RateSeries,
    Comment,
    ShareSeries,
    DownloadChapter,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ActionPayload {
    #[serde(rename = "seriesId")]
    pub series_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Call arrived inside the debounce window; its effect is lost, not queued.
    Debounced,
    /// No mission responded to the action.
    NoChange,
    /// Progress moved; missions that hit their target in this call are listed
    /// so the caller can notify exactly once per completion.
    Updated { completed: Vec<CompletedMission> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMission {
    pub id: String,
    pub title: String,
    pub reward: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimResult {
    pub success: bool,
    pub reward: i32,
}

/// Generate the day's 4 missions: draw a reward pattern, then fill each slot
/// from that reward's bucket preferring unused categories. Retried up to 10
/// times until at least 3 distinct categories result; a tiny pool makes
/// constraint-satisfaction-by-retry fine here.
pub fn generate_daily(date: &str, rng: &mut impl Rng) -> DailyMissions {
    for _ in 0..SELECTION_ATTEMPTS {
        let pattern = REWARD_PATTERNS.choose(rng).copied().unwrap_or(REWARD_PATTERNS[0]);

        let mut selected: Vec<&MissionTemplate> = Vec::with_capacity(4);
        let mut used_ids: HashSet<&str> = HashSet::new();
        let mut used_categories: HashSet<Category> = HashSet::new();
        let mut possible = true;

        for reward in pattern {
            let candidates: Vec<&MissionTemplate> = MISSION_POOL
                .iter()
                .filter(|m| m.reward == reward && !used_ids.contains(m.id))
                .collect();
            if candidates.is_empty() {
                possible = false;
                break;
            }

            let fresh_category: Vec<&&MissionTemplate> = candidates
                .iter()
                .filter(|m| !used_categories.contains(&m.category))
                .collect();

            let chosen: &MissionTemplate = match fresh_category.choose(rng) {
                Some(m) => **m,
                None => match candidates.choose(rng) {
                    Some(m) => *m,
                    None => {
                        possible = false;
                        break;
                    }
                },
            };

            selected.push(chosen);
            used_ids.insert(chosen.id);
            used_categories.insert(chosen.category);
        }

        if possible && used_categories.len() >= MIN_CATEGORIES {
            return DailyMissions {
                date: date.to_string(),
                list: selected.iter().map(|t| ActiveMission::from_template(t)).collect(),
                last_action_ms: 0,
            };
        }
    }

    // Fallback: unconstrained fill of the first pattern.
    let mut used_ids: HashSet<&str> = HashSet::new();
    let mut list = Vec::with_capacity(4);
    for reward in REWARD_PATTERNS[0] {
        let candidates: Vec<&MissionTemplate> = MISSION_POOL
            .iter()
            .filter(|m| m.reward == reward && !used_ids.contains(m.id))
            .collect();
        if let Some(chosen) = candidates.choose(rng) {
            used_ids.insert(chosen.id);
            list.push(ActiveMission::from_template(chosen));
        }
    }
    DailyMissions {
        date: date.to_string(),
        list,
        last_action_ms: 0,
    }
}

/// Which sub-counter (if any) an increment on a compound mission feeds, and
/// that counter's independent cap.
fn sub_cap(mission_id: &str, key: &str) -> Option<u32> {
    match (mission_id, key) {
        ("pool_26", "likes") => Some(5),
        ("pool_26", "ratings") => Some(5),
        ("pool_22", "follows") => Some(3),
        ("pool_22", "comments") => Some(1),
        ("pool_27", "comments") => Some(5),
        ("pool_27", "ratings") => Some(3),
        _ => None,
    }
}

/// Whether `action` counts toward mission `id`, and through which sub-counter.
/// Returns `Some(sub_key)` when it counts; one action can match several
/// missions in the same tick.
fn action_effect(
    action: ActionType,
    payload: &ActionPayload,
    id: &str,
) -> Option<Option<&'static str>> {
    match action {
        ActionType::ReadChapter => match id {
            "pool_2" | "pool_9" | "pool_13" | "pool_15" | "pool_17" | "pool_20" | "pool_21"
            | "pool_24" | "pool_25" => Some(None),
            "pool_10" if payload.series_id.is_some() => Some(None),
            _ => None,
        },
        ActionType::ViewSeriesDetails => matches!(id, "pool_1" | "pool_7").then_some(None),
        ActionType::SearchUsed => (id == "pool_4").then_some(None),
        ActionType::FilterGenre => (id == "pool_8").then_some(None),
        ActionType::VisitProfile => (id == "pool_5").then_some(None),
        ActionType::LoginToday => (id == "pool_6").then_some(None),
        ActionType::LikeChapter => match id {
            "pool_3" | "pool_14" => Some(None),
            "pool_26" => Some(Some("likes")),
            _ => None,
        },
        ActionType::FollowAuthor => match id {
            "pool_11" => Some(None),
            "pool_22" => Some(Some("follows")),
            _ => None,
        },
        ActionType::RateSeries => match id {
            "pool_12" => Some(None),
            "pool_26" | "pool_27" => Some(Some("ratings")),
            _ => None,
        },
        ActionType::Comment => match id {
            "pool_16" | "pool_23" => Some(None),
            "pool_22" | "pool_27" => Some(Some("comments")),
            _ => None,
        },
        ActionType::ShareSeries => matches!(id, "pool_19" | "pool_28").then_some(None),
        ActionType::DownloadChapter => (id == "pool_vip_1").then_some(None),
    }
}

/// Apply one tagged user action to the day's set. Progress is clamped to the
/// target and never decreases; claimed or already-complete missions ignore
/// further actions.
pub fn track_action(
    state: &mut DailyMissions,
    action: ActionType,
    payload: &ActionPayload,
    now_ms: i64,
) -> TrackOutcome {
    if now_ms - state.last_action_ms < DEBOUNCE_MS {
        return TrackOutcome::Debounced;
    }
    state.last_action_ms = now_ms;

    let mut changed = false;
    let mut completed = Vec::new();

    for mission in state.list.iter_mut() {
        if mission.is_claimed || mission.is_complete() {
            continue;
        }

        let Some(sub_key) = action_effect(action, payload, &mission.id) else {
            continue;
        };

        if let Some(key) = sub_key {
            let cap = sub_cap(&mission.id, key).unwrap_or(u32::MAX);
            let counter = mission.progress_details.entry(key.to_string()).or_insert(0);
            if *counter >= cap {
                continue;
            }
            *counter += 1;
        }

        let next = (mission.progress + 1).min(mission.target);
        if next == mission.progress {
            continue;
        }
        mission.progress = next;
        changed = true;

        if mission.is_complete() {
            completed.push(CompletedMission {
                id: mission.id.clone(),
                title: mission.title.clone(),
                reward: mission.reward,
            });
        }
    }

    if changed {
        TrackOutcome::Updated { completed }
    } else {
        TrackOutcome::NoChange
    }
}

/// Claim a completed mission's reward. Terminal: once claimed, repeat calls
/// and further progress are refused.
pub fn claim(state: &mut DailyMissions, mission_id: &str) -> ClaimResult {
    let Some(mission) = state.list.iter_mut().find(|m| m.id == mission_id) else {
        return ClaimResult {
            success: false,
            reward: 0,
        };
    };

    if mission.is_complete() && !mission.is_claimed {
        mission.is_claimed = true;
        ClaimResult {
            success: true,
            reward: mission.reward,
        }
    } else {
        ClaimResult {
            success: false,
            reward: 0,
        }
    }
}

/// One-time reroll of a slot: swap an untouched-enough mission (not claimed,
/// not complete, not already swapped) for a random same-category template not
/// already in today's set. Returns whether a swap happened.
pub fn replace(state: &mut DailyMissions, mission_id: &str, rng: &mut impl Rng) -> bool {
    let Some(index) = state.list.iter().position(|m| m.id == mission_id) else {
        return false;
    };

    let current = &state.list[index];
    if current.swapped || current.is_claimed || current.is_complete() {
        return false;
    }

    let category = current.category;
    let existing: HashSet<&str> = state.list.iter().map(|m| m.id.as_str()).collect();
    let candidates: Vec<&MissionTemplate> = MISSION_POOL
        .iter()
        .filter(|m| m.category == category && !existing.contains(m.id))
        .collect();

    let Some(chosen) = candidates.choose(rng) else {
        return false;
    };

    let mut fresh = ActiveMission::from_template(chosen);
    fresh.swapped = true;
    state.list[index] = fresh;
    true
}

/// Hydrate a stored blob, discarding it when it belongs to another day.
pub fn from_stored(value: &serde_json::Value, today: &str) -> Option<DailyMissions> {
    let parsed: DailyMissions = serde_json::from_value(value.clone()).ok()?;
    if parsed.date == today && parsed.list.len() == 4 {
        Some(parsed)
    } else {
        None
    }
}

/// Day key used for mission scoping: the UTC date string.
pub fn today_key() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
