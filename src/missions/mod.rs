pub mod catalog;
pub mod engine;

pub use catalog::{Category, MissionTemplate, Tier, MISSION_POOL, REWARD_PATTERNS};
pub use engine::{
    generate_daily, track_action, ActionPayload, ActionType, ActiveMission, ClaimResult,
    DailyMissions, TrackOutcome,
};
