//! Vision
//!
//! Field-of-view cone, occlusion rays to the player's reference points and
//! aim-deviation (distraction) detection.

use glam::Vec2;

use crate::components::player::PlayerSnapshot;
use crate::config::VisionConfig;
use crate::error::AgentError;
use crate::geometry::LevelGeometry;

/// Result of looking for the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionReport {
    pub visible: bool,
    /// Player aim points away from this agent; only set while visible
    pub distracted: bool,
    pub player_position: Vec2,
    pub distance: f32,
}

/// Whether `target` lies inside the view cone at `eye` looking along
/// `facing`. A full cone angle of 360° sees everything within range.
pub fn in_field_of_view(eye: Vec2, facing: Vec2, target: Vec2, fov_degrees: f32, range: f32) -> bool {
    let to_target = target - eye;
    let distance = to_target.length();
    if distance > range {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }
    let Some(facing) = facing.try_normalize() else {
        return false;
    };
    let half_angle = (fov_degrees * 0.5).to_radians();
    facing.dot(to_target / distance) >= half_angle.cos()
}

/// Player centre plus two shoulder points perpendicular to the sight line
pub fn reference_points(eye: Vec2, center: Vec2, radius: f32, spread: f32) -> [Vec2; 3] {
    let shoulder = (center - eye).normalize_or_zero().perp() * radius * spread;
    [center, center + shoulder, center - shoulder]
}

/// At least one sight ray reaches a reference point unobstructed
pub fn line_of_sight(geometry: &LevelGeometry, eye: Vec2, points: &[Vec2]) -> bool {
    points.iter().any(|point| !geometry.is_blocked(eye, *point))
}

/// Angle in radians between the player's aim and the direction from the
/// player to the agent. `None` when either vector has zero length.
pub fn aim_deviation(player_position: Vec2, aim_target: Vec2, agent_position: Vec2) -> Option<f32> {
    let aim = (aim_target - player_position).try_normalize()?;
    let to_agent = (agent_position - player_position).try_normalize()?;
    Some(aim.dot(to_agent).clamp(-1.0, 1.0).acos())
}

/// Player aim deviates from this agent by more than the threshold.
/// Degenerate vectors never count as distracted.
pub fn is_distracted(player: &PlayerSnapshot, agent_position: Vec2, threshold: f32) -> bool {
    aim_deviation(player.position, player.aim_target, agent_position)
        .map_or(false, |angle| angle > threshold)
}

/// Looks for the player from `eye` along `facing`.
///
/// Fails with `MissingCollaborator` when the player or the level geometry is
/// absent this tick; callers treat that as "not visible".
pub fn observe_player(
    eye: Vec2,
    facing: Vec2,
    player: Option<&PlayerSnapshot>,
    geometry: Option<&LevelGeometry>,
    config: &VisionConfig,
) -> Result<VisionReport, AgentError> {
    let player = player.ok_or(AgentError::MissingCollaborator {
        collaborator: "player",
    })?;
    if !player.is_finite() {
        return Err(AgentError::NonFinite {
            what: "player snapshot",
        });
    }
    let geometry = geometry.ok_or(AgentError::MissingCollaborator {
        collaborator: "level geometry",
    })?;

    let distance = eye.distance(player.position);
    let visible = in_field_of_view(eye, facing, player.position, config.fov_degrees, config.range)
        && line_of_sight(
            geometry,
            eye,
            &reference_points(eye, player.position, player.radius, config.reference_spread),
        );

    Ok(VisionReport {
        visible,
        distracted: visible && is_distracted(player, eye, config.distraction_threshold),
        player_position: player.position,
        distance,
    })
}
