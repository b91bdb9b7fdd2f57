//! Risk scoring: how likely an artifact holds something a person would miss.
//!
//! Score = category base + size points + age points, clamped to 0..=100.
//! Larger and fresher files score higher; swap files and unrecognized shapes
//! start higher than caches.

#![allow(missing_docs)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scanner::patterns::PatternCategory;

/// Inclusive lower bound of the medium bucket.
pub const MEDIUM_THRESHOLD: u8 = 30;
/// Inclusive lower bound of the high bucket.
pub const HIGH_THRESHOLD: u8 = 70;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Breakdown of one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub score: u8,
    pub level: RiskLevel,
    pub category_points: u8,
    pub size_points: u8,
    pub age_points: u8,
}

/// Low / medium / high counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHistogram {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl RiskHistogram {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.low + self.medium + self.high
    }
}

const fn category_points(category: PatternCategory) -> u8 {
    match category {
        PatternCategory::Unknown => 40,
        PatternCategory::SwapFile => 35,
        PatternCategory::LockFile => 20,
        PatternCategory::CacheFile => 5,
    }
}

const fn size_points(size_bytes: u64) -> u8 {
    if size_bytes >= MIB {
        30
    } else if size_bytes >= 64 * KIB {
        20
    } else if size_bytes >= KIB {
        10
    } else {
        0
    }
}

fn age_points(age: Duration) -> u8 {
    if age < HOUR {
        30
    } else if age < DAY {
        20
    } else if age < WEEK {
        10
    } else {
        0
    }
}

/// Score one file.
#[must_use]
pub fn assess(category: PatternCategory, size_bytes: u64, age: Duration) -> RiskScore {
    let category_points = category_points(category);
    let size_points = size_points(size_bytes);
    let age_points = age_points(age);
    let score = category_points
        .saturating_add(size_points)
        .saturating_add(age_points)
        .min(100);
    RiskScore {
        score,
        level: RiskLevel::from_score(score),
        category_points,
        size_points,
        age_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn stale_tiny_cache_is_low_risk() {
        let r = assess(PatternCategory::CacheFile, 10, 30 * DAY);
        assert_eq!(r.score, 5);
        assert_eq!(r.level, RiskLevel::Low);
    }

    #[test]
    fn fresh_large_unknown_is_capped_high() {
        let r = assess(PatternCategory::Unknown, 10 * MIB, Duration::from_secs(5));
        assert_eq!(r.score, 100);
        assert_eq!(r.level, RiskLevel::High);
        assert_eq!(
            (r.category_points, r.size_points, r.age_points),
            (40, 30, 30)
        );
    }

    #[test]
    fn swap_file_of_the_day_is_medium() {
        let r = assess(PatternCategory::SwapFile, 12 * KIB, 3 * HOUR);
        assert_eq!(r.score, 35 + 10 + 20);
        assert_eq!(r.level, RiskLevel::Medium);
    }

    #[test]
    fn histogram_totals() {
        let mut h = RiskHistogram::default();
        h.record(RiskLevel::Low);
        h.record(RiskLevel::High);
        h.record(RiskLevel::High);
        assert_eq!(h.total(), 3);
        assert_eq!((h.low, h.medium, h.high), (1, 0, 2));
    }
}
