//! Experience and leveling
//!
//! The engine only talks to leveling through [`LevelingOracle`]. The bundled
//! [`StandardLeveling`] is what the terminal front end uses.

use serde::Serialize;

/// Level metadata for a lifetime XP total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub title: String,
    pub emoji: String,
}

/// Descriptive rating for a session result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub name: String,
    pub emoji: String,
    pub message: String,
}

/// Pure lookups the settlement step relies on.
pub trait LevelingOracle {
    fn level_for_xp(&self, total_xp: u64) -> LevelInfo;
    fn tier_for_score(&self, game_id: &str, percentage: u32) -> Tier;
    fn xp_for_result(&self, percentage: u32, level: u32) -> i64;
}

/// Calculate XP needed to go from `level - 1` to `level`
pub fn xp_for_level(level: u32) -> u64 {
    if level <= 1 {
        0
    } else {
        // Base 100 XP for level 2, +50 per level after
        100 + (level as u64 - 2) * 50
    }
}

/// Calculate total XP needed from level 1 to reach a given level
pub fn total_xp_for_level(level: u32) -> u64 {
    (1..level).map(|l| xp_for_level(l + 1)).sum()
}

/// Get a title/rank based on level
pub fn level_title(level: u32) -> (&'static str, &'static str) {
    match level {
        0..=2 => ("Novice", "🌱"),
        3..=4 => ("Apprentice", "📘"),
        5..=7 => ("Scholar", "🎓"),
        8..=10 => ("Sage", "🦉"),
        11..=14 => ("Expert", "🔥"),
        15..=18 => ("Master", "🏆"),
        19..=24 => ("Grandmaster", "💎"),
        _ => ("Legend", "👑"),
    }
}

/// Default leveling curve and tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLeveling;

impl LevelingOracle for StandardLeveling {
    fn level_for_xp(&self, total_xp: u64) -> LevelInfo {
        let mut level = 1;
        let mut next_threshold = xp_for_level(2);
        while total_xp >= next_threshold {
            level += 1;
            next_threshold = next_threshold.saturating_add(xp_for_level(level + 1));
        }
        let (title, emoji) = level_title(level);
        LevelInfo {
            level,
            title: title.to_string(),
            emoji: emoji.to_string(),
        }
    }

    fn tier_for_score(&self, game_id: &str, percentage: u32) -> Tier {
        let (name, emoji, message) = match percentage {
            90..=u32::MAX => ("Legend", "👑", "flawless command of"),
            70..=89 => ("Expert", "🔥", "a strong grip on"),
            40..=69 => ("Contender", "⚡", "a decent feel for"),
            _ => ("Rookie", "🌱", "plenty left to discover in"),
        };
        Tier {
            name: name.to_string(),
            emoji: emoji.to_string(),
            message: format!("You showed {} {}.", message, game_id.replace('_', " ")),
        }
    }

    fn xp_for_result(&self, percentage: u32, level: u32) -> i64 {
        // two XP per level, capped at level 20
        let level_bonus = level.min(20) as i64 * 2;
        percentage.min(100) as i64 + level_bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_for_level() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 100);
        assert_eq!(xp_for_level(3), 150);
        assert_eq!(total_xp_for_level(3), 250);
    }

    #[test]
    fn test_level_for_xp() {
        let oracle = StandardLeveling;
        assert_eq!(oracle.level_for_xp(0).level, 1);
        assert_eq!(oracle.level_for_xp(99).level, 1);
        assert_eq!(oracle.level_for_xp(100).level, 2);
        assert_eq!(oracle.level_for_xp(250).level, 3);
        assert_eq!(oracle.level_for_xp(250).title, "Apprentice");
    }

    #[test]
    fn test_level_for_xp_matches_totals() {
        let oracle = StandardLeveling;
        for level in 2..60 {
            let threshold = total_xp_for_level(level);
            assert_eq!(oracle.level_for_xp(threshold).level, level);
            assert_eq!(oracle.level_for_xp(threshold - 1).level, level - 1);
        }
        assert!(oracle.level_for_xp(1_000_000_000_000).level > 100_000);
    }

    #[test]
    fn test_tiers() {
        let oracle = StandardLeveling;
        assert_eq!(oracle.tier_for_score("science", 100).name, "Legend");
        assert_eq!(oracle.tier_for_score("science", 70).name, "Expert");
        assert_eq!(oracle.tier_for_score("science", 0).name, "Rookie");
        assert!(oracle.tier_for_score("world_history", 50).message.contains("world history"));
    }

    #[test]
    fn test_xp_for_result() {
        let oracle = StandardLeveling;
        assert_eq!(oracle.xp_for_result(70, 1), 72);
        assert_eq!(oracle.xp_for_result(100, 50), 140);
    }
}
