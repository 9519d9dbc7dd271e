//! Intel Sharing
//!
//! Agents near each other copy the better of their peers' player memories at
//! a discount. Transfers are planned from a snapshot of every memory taken
//! before the pass, so intel cannot hop through several agents in one tick.
//! Each unordered pair may share once per cooldown.

use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::HashMap;

use crate::components::agent::AgentId;
use crate::config::{IntelConfig, MIN_INTEL_COOLDOWN};

/// Floating point slack on cooldown comparisons
const COOLDOWN_TOLERANCE: f64 = 1e-6;

/// Last time each pair of agents shared intel
#[derive(Resource, Debug, Default)]
pub struct IntelLedger {
    last_shared: HashMap<(AgentId, AgentId), f64>,
}

impl IntelLedger {
    fn key(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Whether the pair is off cooldown at `now`
    pub fn can_share(&self, a: AgentId, b: AgentId, now: f64, cooldown: f32) -> bool {
        let cooldown = cooldown.max(MIN_INTEL_COOLDOWN) as f64;
        self.last_shared
            .get(&Self::key(a, b))
            .map_or(true, |last| now - last >= cooldown - COOLDOWN_TOLERANCE)
    }

    pub fn record(&mut self, a: AgentId, b: AgentId, now: f64) {
        self.last_shared.insert(Self::key(a, b), now);
    }

    /// Drops pair records involving a dead agent
    pub fn forget(&mut self, agent: AgentId) {
        self.last_shared.retain(|(a, b), _| *a != agent && *b != agent);
    }
}

/// Snapshot of one agent for the sharing pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntelPeer {
    pub id: AgentId,
    pub position: Vec2,
    /// Suspected player position and confidence, if not stale
    pub memory: Option<(Vec2, f32)>,
}

impl IntelPeer {
    fn confidence(&self) -> f32 {
        self.memory.map_or(0.0, |(_, confidence)| confidence)
    }
}

/// One planned copy from `source` to `receiver`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntelTransfer {
    pub receiver: AgentId,
    pub source: AgentId,
    pub position: Vec2,
    /// Source confidence before the sharing factor is applied
    pub source_confidence: f32,
}

/// Plans this tick's intel transfers.
///
/// `peers` must be sorted by ascending id. Every receiver takes at most one
/// transfer: from the in-range, off-cooldown peer whose discounted confidence
/// is highest and beats the receiver's own. Ties go to the lower id.
pub fn plan_intel_transfers(
    peers: &[IntelPeer],
    ledger: &IntelLedger,
    now: f64,
    config: &IntelConfig,
) -> Vec<IntelTransfer> {
    let mut transfers = Vec::new();

    for receiver in peers {
        let own = receiver.confidence();
        let mut best: Option<(f32, &IntelPeer, Vec2, f32)> = None;

        for source in peers {
            if source.id == receiver.id {
                continue;
            }
            let Some((position, confidence)) = source.memory else {
                continue;
            };
            if source.position.distance(receiver.position) > config.radius {
                continue;
            }
            if !ledger.can_share(receiver.id, source.id, now, config.cooldown) {
                continue;
            }
            let offered = confidence * config.factor;
            if offered <= own {
                continue;
            }
            if best.map_or(true, |(best_offer, ..)| offered > best_offer) {
                best = Some((offered, source, position, confidence));
            }
        }

        if let Some((_, source, position, source_confidence)) = best {
            transfers.push(IntelTransfer {
                receiver: receiver.id,
                source: source.id,
                position,
                source_confidence,
            });
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u32, x: f32, memory: Option<f32>) -> IntelPeer {
        IntelPeer {
            id: AgentId(id),
            position: Vec2::new(x, 0.0),
            memory: memory.map(|c| (Vec2::new(500.0, 500.0), c)),
        }
    }

    #[test]
    fn test_best_source_in_range_wins() {
        let peers = vec![
            peer(0, 0.0, None),
            peer(1, 100.0, Some(0.7)),
            peer(2, 200.0, Some(1.0)),
            peer(3, 1000.0, Some(1.0)),
        ];
        let transfers =
            plan_intel_transfers(&peers, &IntelLedger::default(), 0.0, &IntelConfig::default());

        let to_zero: Vec<_> = transfers
            .iter()
            .filter(|t| t.receiver == AgentId(0))
            .collect();
        assert_eq!(to_zero.len(), 1);
        assert_eq!(to_zero[0].source, AgentId(2));
        // Agent 2 already knows more than anyone in range can offer
        assert!(transfers.iter().all(|t| t.receiver != AgentId(2)));
    }

    #[test]
    fn test_ties_go_to_lower_id() {
        let peers = vec![
            peer(0, 0.0, None),
            peer(1, 100.0, Some(0.8)),
            peer(2, -100.0, Some(0.8)),
        ];
        let transfers =
            plan_intel_transfers(&peers, &IntelLedger::default(), 0.0, &IntelConfig::default());
        assert_eq!(transfers[0].receiver, AgentId(0));
        assert_eq!(transfers[0].source, AgentId(1));
    }

    #[test]
    fn test_snapshot_prevents_chaining() {
        // 0 knows, 2 is out of 0's range but within 1's range
        let peers = vec![
            peer(0, 0.0, Some(1.0)),
            peer(1, 300.0, None),
            peer(2, 600.0, None),
        ];
        let transfers =
            plan_intel_transfers(&peers, &IntelLedger::default(), 0.0, &IntelConfig::default());
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].receiver, AgentId(1));
    }

    #[test]
    fn test_pair_cooldown_is_unordered() {
        let mut ledger = IntelLedger::default();
        ledger.record(AgentId(1), AgentId(0), 10.0);
        assert!(!ledger.can_share(AgentId(0), AgentId(1), 14.0, 5.0));
        assert!(ledger.can_share(AgentId(0), AgentId(1), 15.0, 5.0));
        // A shorter configured cooldown is clamped up
        assert!(!ledger.can_share(AgentId(0), AgentId(1), 12.0, 1.0));

        let peers = vec![peer(0, 0.0, None), peer(1, 100.0, Some(1.0))];
        let config = IntelConfig::default();
        assert!(plan_intel_transfers(&peers, &ledger, 12.0, &config).is_empty());
        assert_eq!(plan_intel_transfers(&peers, &ledger, 15.0, &config).len(), 1);

        ledger.forget(AgentId(1));
        assert!(ledger.can_share(AgentId(0), AgentId(1), 11.0, 5.0));
    }
}
