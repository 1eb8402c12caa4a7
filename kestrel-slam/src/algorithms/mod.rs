//! Core algorithms: mapping, scan matching, localization.

pub mod localization;
pub mod mapping;
pub mod matching;
