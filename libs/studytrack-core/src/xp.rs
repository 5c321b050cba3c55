//! Experience points and level progression.

use crate::types::UserProfile;
use serde::{Deserialize, Serialize};

/// XP needed to advance one level.
pub const XP_PER_LEVEL: i64 = 500;

/// Level reached with `xp` total experience.
pub fn level_for_xp(xp: i64) -> i64 {
    1 + xp / XP_PER_LEVEL
}

/// Progress within the current level, in `0..XP_PER_LEVEL`.
pub fn xp_into_level(xp: i64) -> i64 {
    xp % XP_PER_LEVEL
}

/// Outcome of an XP award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAward {
    pub xp: i64,
    pub level: i64,
    pub leveled_up: bool,
}

/// Apply an award to a profile and report the outcome.
///
/// `sessions` is added to the completed-session counter (1 for a finished
/// focus session, 0 for bonus awards).
pub fn award_xp(profile: &mut UserProfile, amount: i64, sessions: i64) -> XpAward {
    let previous_level = profile.level;
    profile.xp += amount;
    profile.level = level_for_xp(profile.xp);
    profile.total_sessions += sessions;
    XpAward {
        xp: profile.xp,
        level: profile.level,
        leveled_up: profile.level > previous_level,
    }
}
