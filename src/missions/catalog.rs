// src/missions/catalog.rs
//
// Fixed template pool for the daily missions. Titles and descriptions are
// i18n keys resolved by the client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Read,
    Social,
    Explore,
    Engagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
    Expert,
}

#[derive(Debug, Clone, Copy)]
pub struct MissionTemplate {
    pub id: &'static str,
    pub title_key: &'static str,
    pub desc_key: &'static str,
    pub reward: i32,
    pub target: u32,
    pub tier: Tier,
    pub category: Category,
}

macro_rules! mission {
    ($id:literal, $reward:literal, $target:literal, $tier:ident, $category:ident) => {
        MissionTemplate {
            id: $id,
            title_key: concat!("mission_", $id, "_title"),
            desc_key: concat!("mission_", $id, "_desc"),
            reward: $reward,
            target: $target,
            tier: Tier::$tier,
            category: Category::$category,
        }
    };
}

pub const MISSION_POOL: [MissionTemplate; 29] = [
    // 5 Inks
    mission!("pool_1", 5, 2, Easy, Explore),
    mission!("pool_2", 5, 1, Easy, Read),
    mission!("pool_3", 5, 1, Easy, Engagement),
    mission!("pool_4", 5, 1, Easy, Explore),
    mission!("pool_5", 5, 1, Easy, Social),
    mission!("pool_6", 5, 1, Easy, Engagement),
    mission!("pool_7", 5, 3, Easy, Explore),
    mission!("pool_8", 5, 1, Easy, Read),
    // 10 Inks
    mission!("pool_9", 10, 3, Medium, Read),
    mission!("pool_10", 10, 2, Medium, Explore),
    mission!("pool_11", 10, 1, Medium, Social),
    mission!("pool_12", 10, 1, Medium, Engagement),
    mission!("pool_13", 10, 3, Medium, Read),
    mission!("pool_14", 10, 3, Medium, Engagement),
    // 15 Inks
    mission!("pool_15", 15, 5, Medium, Read),
    mission!("pool_16", 15, 1, Medium, Social),
    mission!("pool_17", 15, 3, Medium, Explore),
    mission!("pool_18", 15, 1, Medium, Read),
    mission!("pool_19", 15, 1, Medium, Social),
    mission!("pool_20", 15, 2, Medium, Read),
    // 20 Inks
    mission!("pool_21", 20, 10, Hard, Read),
    mission!("pool_22", 20, 4, Hard, Social),
    mission!("pool_23", 20, 3, Hard, Engagement),
    mission!("pool_24", 20, 5, Hard, Explore),
    // 25 Inks
    mission!("pool_25", 25, 20, Expert, Read),
    mission!("pool_26", 25, 10, Expert, Engagement),
    mission!("pool_27", 25, 8, Expert, Social),
    mission!("pool_28", 25, 5, Expert, Social),
    // VIP exclusive
    mission!("pool_vip_1", 20, 1, Medium, Engagement),
];

/// Reward shapes a daily set can take; one is drawn at random per day.
pub const REWARD_PATTERNS: [[i32; 4]; 6] = [
    [5, 10, 20, 25],
    [5, 5, 25, 25],
    [10, 10, 20, 20],
    [5, 15, 20, 20],
    [10, 15, 15, 20],
    [5, 15, 15, 25],
];

pub fn template(id: &str) -> Option<&'static MissionTemplate> {
    MISSION_POOL.iter().find(|m| m.id == id)
}
