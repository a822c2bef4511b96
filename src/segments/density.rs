//! Issue density and its discrete color buckets.
//!
//! | issues/km | bucket    | color     |
//! |-----------|-----------|-----------|
//! | ≤ 1       | low       | `#00FF00` |
//! | ≤ 3       | medium    | `#FFFF00` |
//! | ≤ 5       | high      | `#FFA500` |
//! | > 5       | very high | `#FF0000` |
//!
//! Boundaries are inclusive on the lower bucket.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Density value
// ---------------------------------------------------------------------------

/// Issue density of a road section, tagged with its unit.
///
/// Sections without any recorded distance fall back to the raw issue count.
/// The variant keeps that unit switch visible to consumers; bucketing uses
/// the numeric value either way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum IssueDensity {
    /// Issues per kilometer.
    PerKm(f64),
    /// Raw issue count of a section with zero total distance.
    PerSection(f64),
}

impl IssueDensity {
    pub fn compute(total_issues: u32, total_distance_m: f64) -> Self {
        let distance_km = total_distance_m / 1000.0;
        if distance_km > 0.0 {
            Self::PerKm(f64::from(total_issues) / distance_km)
        } else {
            Self::PerSection(f64::from(total_issues))
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Self::PerKm(v) | Self::PerSection(v) => v,
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self {
            Self::PerKm(_) => "issues/km",
            Self::PerSection(_) => "issues (no distance)",
        }
    }
}

impl std::fmt::Display for IssueDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} {}", self.value(), self.unit_label())
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityBucket {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl DensityBucket {
    pub const ALL: [DensityBucket; 4] = [Self::Low, Self::Medium, Self::High, Self::VeryHigh];

    /// Stroke color for polylines in this bucket.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#00FF00",
            Self::Medium => "#FFFF00",
            Self::High => "#FFA500",
            Self::VeryHigh => "#FF0000",
        }
    }
}

impl std::fmt::Display for DensityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::VeryHigh => write!(f, "very high"),
        }
    }
}

/// Upper bounds (inclusive) of the first three buckets.
///
/// Also serves as the `[density]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityThresholds {
    pub low_max: f64,
    pub medium_max: f64,
    pub high_max: f64,
}

impl Default for DensityThresholds {
    fn default() -> Self {
        Self {
            low_max: 1.0,
            medium_max: 3.0,
            high_max: 5.0,
        }
    }
}

impl DensityThresholds {
    /// Thresholds must be finite and strictly ascending.
    pub fn is_valid(&self) -> bool {
        [self.low_max, self.medium_max, self.high_max]
            .iter()
            .all(|v| v.is_finite())
            && self.low_max < self.medium_max
            && self.medium_max < self.high_max
    }

    pub fn classify(&self, issues_per_km: f64) -> DensityBucket {
        if issues_per_km <= self.low_max {
            DensityBucket::Low
        } else if issues_per_km <= self.medium_max {
            DensityBucket::Medium
        } else if issues_per_km <= self.high_max {
            DensityBucket::High
        } else {
            DensityBucket::VeryHigh
        }
    }

    /// Legend rows in bucket order.
    pub fn legend(&self) -> Vec<LegendEntry> {
        DensityBucket::ALL
            .iter()
            .map(|&bucket| {
                let range = match bucket {
                    DensityBucket::Low => format!("0-{}", self.low_max),
                    DensityBucket::Medium => format!("{}-{}", self.low_max, self.medium_max),
                    DensityBucket::High => format!("{}-{}", self.medium_max, self.high_max),
                    DensityBucket::VeryHigh => format!("{}+", self.high_max),
                };
                LegendEntry {
                    bucket,
                    color: bucket.color(),
                    label: format!("{range} issues/km"),
                }
            })
            .collect()
    }
}

/// One row of the map legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub bucket: DensityBucket,
    pub color: &'static str,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_fall_in_lower_bucket() {
        let t = DensityThresholds::default();
        assert_eq!(t.classify(0.0), DensityBucket::Low);
        assert_eq!(t.classify(1.0), DensityBucket::Low);
        assert_eq!(t.classify(1.0001), DensityBucket::Medium);
        assert_eq!(t.classify(3.0), DensityBucket::Medium);
        assert_eq!(t.classify(5.0), DensityBucket::High);
        assert_eq!(t.classify(5.0001), DensityBucket::VeryHigh);
    }

    #[test]
    fn zero_distance_falls_back_to_raw_count() {
        let d = IssueDensity::compute(4, 0.0);
        assert_eq!(d, IssueDensity::PerSection(4.0));
        assert_eq!(d.value(), 4.0);
        assert_eq!(d.unit_label(), "issues (no distance)");
    }

    #[test]
    fn density_per_km() {
        assert_eq!(IssueDensity::compute(6, 1000.0), IssueDensity::PerKm(6.0));
        assert_eq!(IssueDensity::compute(1, 500.0).to_string(), "2.0 issues/km");
    }

    #[test]
    fn density_serializes_with_unit_tag() {
        let json = serde_json::to_string(&IssueDensity::PerKm(2.5)).unwrap();
        assert_eq!(json, r#"{"unit":"per_km","value":2.5}"#);
    }

    #[test]
    fn legend_labels() {
        let labels: Vec<String> = DensityThresholds::default()
            .legend()
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(
            labels,
            [
                "0-1 issues/km",
                "1-3 issues/km",
                "3-5 issues/km",
                "5+ issues/km"
            ]
        );
    }

    #[test]
    fn unordered_thresholds_are_invalid() {
        let t = DensityThresholds {
            low_max: 3.0,
            medium_max: 1.0,
            high_max: 5.0,
        };
        assert!(!t.is_valid());
        assert!(DensityThresholds::default().is_valid());
    }
}
