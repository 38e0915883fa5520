use std::time::Duration;

/// Tuning for the per-level NPC loop. Distances are world units, speeds
/// are units per second.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub interval: Duration,
    /// Length of one physics sub-step in seconds.
    pub timestep: f32,
    pub aggro_radius: f32,
    pub attack_range: f32,
    pub stop_distance: f32,
    pub max_speed: f32,
    /// Velocity change allowed per sub-step while chasing.
    pub acceleration: f32,
    /// Velocity multiplier applied every sub-step.
    pub friction: f32,
    pub attack_cooldown: Duration,
    pub base_damage: i32,
    pub damage_per_level: i32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(125),
            timestep: 1.0 / 60.0,
            aggro_radius: 400.0,
            attack_range: 90.0,
            stop_distance: 50.0,
            max_speed: 400.0,
            acceleration: 40.0,
            friction: 0.977,
            attack_cooldown: Duration::from_millis(1500),
            base_damage: 15,
            damage_per_level: 2,
        }
    }
}

impl AiConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Whole physics sub-steps that fit in one tick, at least one.
    pub fn substeps(&self) -> u32 {
        ((self.interval.as_secs_f32() / self.timestep) as u32).max(1)
    }

    pub fn damage_for(&self, npc_level: u32) -> i32 {
        self.base_damage + self.damage_per_level * npc_level as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_substeps() {
        assert_eq!(AiConfig::default().substeps(), 7);
        assert_eq!(AiConfig::with_interval(Duration::from_millis(1)).substeps(), 1);
    }

    #[test]
    fn test_damage_scales_with_level() {
        let config = AiConfig::default();
        assert_eq!(config.damage_for(1), 17);
        assert_eq!(config.damage_for(10), 35);
    }
}
