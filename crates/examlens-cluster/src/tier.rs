//! Priority tier calculation from repetition counts.

use examlens_core::config::PriorityConfig;
use examlens_core::PriorityTier;

use crate::error::ClusterError;

/// Map a cluster's repetition count to its priority tier.
///
/// With default cutoffs: 4+ is Tier 1, 3 is Tier 2, 2 is Tier 3 and 1 is
/// Tier 4. A count of zero means a cluster with no members, which the
/// builder never produces, so it is rejected.
pub fn priority_tier(count: usize, cutoffs: &PriorityConfig) -> Result<PriorityTier, ClusterError> {
    if count == 0 {
        return Err(ClusterError::PreconditionViolation(
            "priority tier requested for a cluster with zero members".to_string(),
        ));
    }
    let tier = if count >= cutoffs.tier_1_min as usize {
        PriorityTier::Tier1
    } else if count >= cutoffs.tier_2_min as usize {
        PriorityTier::Tier2
    } else if count >= cutoffs.tier_3_min as usize {
        PriorityTier::Tier3
    } else {
        PriorityTier::Tier4
    };
    Ok(tier)
}
