//! Facing
//!
//! Where an agent looks is decided by one ordered rule list, evaluated top
//! down each tick. The first rule with an opinion wins. Facing never
//! changes movement: an agent can retreat while tracking its attacker.

use glam::Vec2;

/// Velocities slower than this do not turn the agent
pub const MIN_FACING_SPEED: f32 = 1.0;

/// Facing rules, highest priority first in [`FacingRule::ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingRule {
    /// Look back at whoever just hit us
    HitReaction,
    /// Look at the visible player
    PlayerVisible,
    /// While flanking, keep looking at where the player should be
    Flanking,
    /// Glance into a detected opening
    CornerPeek,
    /// Look where we are going
    Movement,
    /// Idle sweep around the rest heading
    Scan,
}

impl FacingRule {
    pub const ORDER: [FacingRule; 6] = [
        FacingRule::HitReaction,
        FacingRule::PlayerVisible,
        FacingRule::Flanking,
        FacingRule::CornerPeek,
        FacingRule::Movement,
        FacingRule::Scan,
    ];
}

/// Everything the facing rules look at
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FacingInputs {
    pub position: Vec2,
    /// Current facing, kept when no rule applies
    pub current: Vec2,
    /// Attacker direction while the hit reaction timer runs
    pub hit_reaction: Option<Vec2>,
    /// Player position while visible
    pub visible_player: Option<Vec2>,
    /// Remembered or anchor position while in FLANKING
    pub flank_focus: Option<Vec2>,
    /// Peek direction while the corner peek timer runs
    pub peek: Option<Vec2>,
    pub velocity: Vec2,
    /// Idle scan direction
    pub scan: Vec2,
}

impl FacingInputs {
    fn candidate(&self, rule: FacingRule) -> Option<Vec2> {
        match rule {
            FacingRule::HitReaction => self.hit_reaction?.try_normalize(),
            FacingRule::PlayerVisible => (self.visible_player? - self.position).try_normalize(),
            FacingRule::Flanking => (self.flank_focus? - self.position).try_normalize(),
            FacingRule::CornerPeek => self.peek?.try_normalize(),
            FacingRule::Movement => {
                if self.velocity.length() < MIN_FACING_SPEED {
                    None
                } else {
                    self.velocity.try_normalize()
                }
            }
            FacingRule::Scan => self.scan.try_normalize(),
        }
    }
}

/// Resolves facing and reports which rule decided it
pub fn resolve(inputs: &FacingInputs) -> (Vec2, FacingRule) {
    FacingRule::ORDER
        .iter()
        .find_map(|rule| inputs.candidate(*rule).map(|dir| (dir, *rule)))
        .unwrap_or_else(|| {
            let current = inputs.current.try_normalize().unwrap_or(Vec2::X);
            (current, FacingRule::Scan)
        })
}

/// Idle scan: sweeps `amplitude` radians either side of `rest_heading`
/// over `period` seconds
pub fn scan_direction(rest_heading: Vec2, amplitude: f32, period: f32, time: f64) -> Vec2 {
    let heading = rest_heading.try_normalize().unwrap_or(Vec2::X);
    if period <= 0.0 {
        return heading;
    }
    let phase = (time % period as f64) as f32 / period * std::f32::consts::TAU;
    Vec2::from_angle(amplitude * phase.sin()).rotate(heading)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving() -> FacingInputs {
        FacingInputs {
            position: Vec2::ZERO,
            current: Vec2::X,
            velocity: Vec2::new(0.0, 120.0),
            scan: Vec2::NEG_Y,
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_reaction_beats_everything() {
        let inputs = FacingInputs {
            hit_reaction: Some(Vec2::NEG_X),
            visible_player: Some(Vec2::new(100.0, 0.0)),
            flank_focus: Some(Vec2::new(0.0, 100.0)),
            peek: Some(Vec2::Y),
            ..moving()
        };
        assert_eq!(resolve(&inputs), (Vec2::NEG_X, FacingRule::HitReaction));
    }

    #[test]
    fn test_flanking_beats_peek_and_movement() {
        let inputs = FacingInputs {
            flank_focus: Some(Vec2::new(50.0, 0.0)),
            peek: Some(Vec2::NEG_Y),
            ..moving()
        };
        assert_eq!(resolve(&inputs), (Vec2::X, FacingRule::Flanking));
    }

    #[test]
    fn test_peek_beats_movement() {
        let inputs = FacingInputs {
            peek: Some(Vec2::NEG_X),
            ..moving()
        };
        assert_eq!(resolve(&inputs).1, FacingRule::CornerPeek);
        assert_eq!(resolve(&moving()), (Vec2::Y, FacingRule::Movement));
    }

    #[test]
    fn test_standing_still_scans() {
        let inputs = FacingInputs {
            velocity: Vec2::new(0.2, 0.0),
            ..moving()
        };
        assert_eq!(resolve(&inputs), (Vec2::NEG_Y, FacingRule::Scan));
    }

    #[test]
    fn test_scan_sweeps_around_rest() {
        let amplitude = 45f32.to_radians();
        let start = scan_direction(Vec2::X, amplitude, 4.0, 0.0);
        assert!((start - Vec2::X).length() < 1e-5);
        let quarter = scan_direction(Vec2::X, amplitude, 4.0, 1.0);
        assert!((quarter.angle_between(Vec2::X).abs() - amplitude).abs() < 1e-4);
    }
}
