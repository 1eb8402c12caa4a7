//! Error types for the SLAM core.

use thiserror::Error;

/// Failures the estimation core can surface to the caller.
///
/// These are the fatal numerical conditions of a SLAM step. Recoverable
/// conditions (a failed scan match) are handled internally and never
/// reach this type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlamError {
    /// Every candidate pose scored zero likelihood, so no proposal
    /// distribution could be formed. Indicates an invalid measurement
    /// or catastrophic particle drift; the step must be aborted.
    #[error("proposal collapsed: candidate likelihoods sum to zero")]
    ProposalCollapse,

    /// The particle weights sum to zero and cannot be normalized.
    #[error("particle weights sum to zero")]
    WeightCollapse,

    /// A covariance matrix handed to the sampler was not positive
    /// semi-definite.
    #[error("covariance is not positive semi-definite")]
    NotPositiveDefinite,
}

pub type Result<T> = std::result::Result<T, SlamError>;
