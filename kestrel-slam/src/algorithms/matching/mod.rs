//! Scan-matcher interface.
//!
//! The matcher itself (ICP or similar) is an external collaborator;
//! this module defines the seam the filter drives, plus the trivial
//! matchers used for testing and for running without one.

use crate::core::types::{LaserScan, Pose2D};

/// Result of a scan matching attempt.
#[derive(Debug, Clone, Copy)]
pub struct ScanMatchResult {
    /// Estimated rigid transform refining the initial guess.
    pub transform: Pose2D,

    /// Whether the algorithm converged. A failed match carries an
    /// identity transform and must be ignored by the caller.
    pub converged: bool,
}

impl ScanMatchResult {
    /// A failed match.
    pub fn failed() -> Self {
        Self {
            transform: Pose2D::identity(),
            converged: false,
        }
    }

    /// A converged match with the given transform.
    pub fn success(transform: Pose2D) -> Self {
        Self {
            transform,
            converged: true,
        }
    }
}

/// Trait for scan matching algorithms.
///
/// Takes `&mut self` so real matchers can keep the previous scan and
/// reuse internal buffers.
pub trait ScanMatcher {
    /// Align `scan` against the matcher's reference, starting from
    /// `initial_guess`.
    fn match_scan(&mut self, scan: &LaserScan, initial_guess: &Pose2D) -> ScanMatchResult;
}

/// Matcher that accepts every scan at the initial guess.
///
/// Stands in for a real matcher in tests and degenerate setups where
/// odometry alone is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMatcher;

impl ScanMatcher for IdentityMatcher {
    fn match_scan(&mut self, _scan: &LaserScan, initial_guess: &Pose2D) -> ScanMatchResult {
        ScanMatchResult::success(*initial_guess)
    }
}

/// Matcher that rejects every scan.
///
/// Exercises the motion-model fallback path of the filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingMatcher;

impl ScanMatcher for RejectingMatcher {
    fn match_scan(&mut self, _scan: &LaserScan, _initial_guess: &Pose2D) -> ScanMatchResult {
        ScanMatchResult::failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> LaserScan {
        LaserScan::new(0.0, 0.0, 0.1, 0.1, 8.0, vec![1.0])
    }

    #[test]
    fn test_identity_matcher_returns_guess() {
        let guess = Pose2D::new(0.2, -0.1, 0.05);
        let result = IdentityMatcher.match_scan(&scan(), &guess);
        assert!(result.converged);
        assert_eq!(result.transform, guess);
    }

    #[test]
    fn test_rejecting_matcher_fails() {
        let result = RejectingMatcher.match_scan(&scan(), &Pose2D::identity());
        assert!(!result.converged);
    }
}
