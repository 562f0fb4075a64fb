//! Tunable scoring constants for the five heuristics.
//!
//! Defaults reproduce the reference formulas:
//!
//! | Heuristic | Confidence | Cap |
//! |-----------|------------|-----|
//! | Shared tags | `min(0.8, 0.2 + 0.15 * shared)` | top 10 |
//! | Same community | `min(0.7, 0.3 + 0.1 * mutual)`, mutual >= 2 | top 5 |
//! | Mutual connections | `min(0.6, 0.2 + 0.1 * mutual)` | top 8 |
//! | Temporal proximity | `min(0.5, 0.1 + 0.3 / (1 + gap_days) + 0.2 * same_folder)` | top 6 |
//! | Similar content | same folder `min(0.6, 0.4 + 0.3)`, else `min(0.6, 0.2)` | top 5 |

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Milliseconds per day.
pub const MS_PER_DAY: f64 = 86_400_000.0;

/// `min(cap, base + factor * count)` scoring with a result cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountScoring {
    /// Score before any evidence.
    pub base: f64,
    /// Added per unit of evidence.
    pub factor: f64,
    /// Upper bound; must stay below 1.
    pub cap: f64,
    /// Maximum candidates the heuristic returns.
    pub limit: usize,
}

impl CountScoring {
    /// Scores `count` units of evidence.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, count: usize) -> f64 {
        self.factor.mul_add(count as f64, self.base).min(self.cap)
    }

    fn validate(&self, name: &str) -> Result<()> {
        validate_unit(name, "base", self.base)?;
        validate_unit(name, "factor", self.factor)?;
        validate_cap(name, self.cap)
    }
}

/// Temporal proximity scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalScoring {
    /// Floor score.
    pub base: f64,
    /// Numerator of the `decay / (1 + gap_days)` term.
    pub decay: f64,
    /// Bonus when both nodes share a folder.
    pub same_folder_bonus: f64,
    /// Upper bound; must stay below 1.
    pub cap: f64,
    /// Creation-time window in days.
    pub created_window_days: f64,
    /// Modification-time window in days.
    pub modified_window_days: f64,
    /// Maximum candidates returned.
    pub limit: usize,
}

impl Default for TemporalScoring {
    fn default() -> Self {
        Self {
            base: 0.1,
            decay: 0.3,
            same_folder_bonus: 0.2,
            cap: 0.5,
            created_window_days: 7.0,
            modified_window_days: 3.0,
            limit: 6,
        }
    }
}

impl TemporalScoring {
    /// Scores a candidate whose nearest timestamp gap is `gap_days`.
    #[must_use]
    pub fn score(&self, gap_days: f64, same_folder: bool) -> f64 {
        let bonus = if same_folder {
            self.same_folder_bonus
        } else {
            0.0
        };
        (self.base + self.decay / (1.0 + gap_days.max(0.0)) + bonus).min(self.cap)
    }

    /// Creation window in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn created_window_ms(&self) -> i64 {
        (self.created_window_days * MS_PER_DAY).round() as i64
    }

    /// Modification window in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn modified_window_ms(&self) -> i64 {
        (self.modified_window_days * MS_PER_DAY).round() as i64
    }

    fn validate(&self) -> Result<()> {
        validate_unit("temporal", "base", self.base)?;
        validate_unit("temporal", "decay", self.decay)?;
        validate_unit("temporal", "same_folder_bonus", self.same_folder_bonus)?;
        validate_cap("temporal", self.cap)?;
        for (field, days) in [
            ("created_window_days", self.created_window_days),
            ("modified_window_days", self.modified_window_days),
        ] {
            if !days.is_finite() || days < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "scoring.temporal.{field} must be a non-negative number, got {days}"
                )));
            }
        }
        Ok(())
    }
}

/// Similar-content scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentScoring {
    /// Score for a same-folder candidate before the folder bonus.
    pub folder_base: f64,
    /// Bonus for a same-folder candidate.
    pub folder_bonus: f64,
    /// Score for any other candidate.
    pub other: f64,
    /// Upper bound; must stay below 1.
    pub cap: f64,
    /// Allowed name-length difference, as a fraction of the target's.
    pub name_ratio: f64,
    /// Allowed content-length difference, as a fraction of the target's.
    pub content_ratio: f64,
    /// Maximum candidates returned.
    pub limit: usize,
}

impl Default for ContentScoring {
    fn default() -> Self {
        Self {
            folder_base: 0.4,
            folder_bonus: 0.3,
            other: 0.2,
            cap: 0.6,
            name_ratio: 0.5,
            content_ratio: 0.3,
            limit: 5,
        }
    }
}

impl ContentScoring {
    /// Scores a candidate.
    #[must_use]
    pub fn score(&self, same_folder: bool) -> f64 {
        if same_folder {
            (self.folder_base + self.folder_bonus).min(self.cap)
        } else {
            self.other.min(self.cap)
        }
    }

    fn validate(&self) -> Result<()> {
        validate_unit("content", "folder_base", self.folder_base)?;
        validate_unit("content", "folder_bonus", self.folder_bonus)?;
        validate_unit("content", "other", self.other)?;
        validate_cap("content", self.cap)?;
        validate_unit("content", "name_ratio", self.name_ratio)?;
        validate_unit("content", "content_ratio", self.content_ratio)
    }
}

/// All heuristic constants.
///
/// Deserializing overlays whatever a config file sets onto the defaults, so a
/// section may tune a single field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScoringFile")]
pub struct ScoringConfig {
    /// Shared tags.
    pub shared_tags: CountScoring,
    /// Same community.
    pub same_community: CountScoring,
    /// Minimum mutual neighbours for a same-community candidate.
    pub community_min_mutual: usize,
    /// Mutual connections.
    pub mutual_connections: CountScoring,
    /// Temporal proximity.
    pub temporal: TemporalScoring,
    /// Similar content.
    pub content: ContentScoring,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            shared_tags: CountScoring {
                base: 0.2,
                factor: 0.15,
                cap: 0.8,
                limit: 10,
            },
            same_community: CountScoring {
                base: 0.3,
                factor: 0.1,
                cap: 0.7,
                limit: 5,
            },
            community_min_mutual: 2,
            mutual_connections: CountScoring {
                base: 0.2,
                factor: 0.1,
                cap: 0.6,
                limit: 8,
            },
            temporal: TemporalScoring::default(),
            content: ContentScoring::default(),
        }
    }
}

impl ScoringConfig {
    /// Checks that every formula stays finite and below 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.shared_tags.validate("shared_tags")?;
        self.same_community.validate("same_community")?;
        self.mutual_connections.validate("mutual_connections")?;
        self.temporal.validate()?;
        self.content.validate()?;
        if self.community_min_mutual == 0 {
            return Err(Error::InvalidInput(
                "scoring.community_min_mutual must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `CountScoring` as read from a config file; every field optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct CountScoringFile {
    base: Option<f64>,
    factor: Option<f64>,
    cap: Option<f64>,
    limit: Option<usize>,
}

impl CountScoringFile {
    fn overlay(self, defaults: CountScoring) -> CountScoring {
        CountScoring {
            base: self.base.unwrap_or(defaults.base),
            factor: self.factor.unwrap_or(defaults.factor),
            cap: self.cap.unwrap_or(defaults.cap),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// `ScoringConfig` as read from a config file; every section optional.
#[derive(Debug, Default, Deserialize)]
struct ScoringFile {
    shared_tags: Option<CountScoringFile>,
    same_community: Option<CountScoringFile>,
    community_min_mutual: Option<usize>,
    mutual_connections: Option<CountScoringFile>,
    temporal: Option<TemporalScoring>,
    content: Option<ContentScoring>,
}

impl From<ScoringFile> for ScoringConfig {
    fn from(file: ScoringFile) -> Self {
        let defaults = Self::default();
        Self {
            shared_tags: file
                .shared_tags
                .unwrap_or_default()
                .overlay(defaults.shared_tags),
            same_community: file
                .same_community
                .unwrap_or_default()
                .overlay(defaults.same_community),
            community_min_mutual: file
                .community_min_mutual
                .unwrap_or(defaults.community_min_mutual),
            mutual_connections: file
                .mutual_connections
                .unwrap_or_default()
                .overlay(defaults.mutual_connections),
            temporal: file.temporal.unwrap_or(defaults.temporal),
            content: file.content.unwrap_or(defaults.content),
        }
    }
}

fn validate_unit(section: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "scoring.{section}.{field} must be a non-negative number, got {value}"
        )))
    }
}

fn validate_cap(section: &str, cap: f64) -> Result<()> {
    if cap.is_finite() && (0.0..1.0).contains(&cap) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "scoring.{section}.cap must lie in [0, 1), got {cap}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test_case(1, 0.35 ; "one tag")]
    #[test_case(3, 0.65 ; "three tags")]
    #[test_case(4, 0.8 ; "four tags hits cap")]
    #[test_case(9, 0.8 ; "saturated")]
    fn test_shared_tag_scores(count: usize, expected: f64) {
        assert!(approx(ScoringConfig::default().shared_tags.score(count), expected));
    }

    #[test_case(2, 0.5 ; "two mutual")]
    #[test_case(4, 0.7 ; "four mutual hits cap")]
    fn test_community_scores(count: usize, expected: f64) {
        assert!(approx(ScoringConfig::default().same_community.score(count), expected));
    }

    #[test]
    fn test_mutual_scores_cap() {
        let scoring = ScoringConfig::default().mutual_connections;
        assert!(approx(scoring.score(1), 0.3));
        assert!(approx(scoring.score(10), 0.6));
    }

    #[test]
    fn test_temporal_scores() {
        let scoring = TemporalScoring::default();
        assert!(approx(scoring.score(0.0, false), 0.4));
        assert!(approx(scoring.score(0.0, true), 0.5));
        assert!(approx(scoring.score(2.0, false), 0.2));
        assert!(scoring.score(6.9, false) > 0.1);
        assert_eq!(scoring.created_window_ms(), 7 * 86_400_000);
    }

    #[test]
    fn test_content_scores() {
        let scoring = ContentScoring::default();
        assert!(approx(scoring.score(true), 0.6));
        assert!(approx(scoring.score(false), 0.2));
    }

    #[test]
    fn test_single_field_overlays_heuristic_defaults() {
        let scoring: ScoringConfig = toml::from_str(
            "[shared_tags]\ncap = 0.7\n\n[mutual_connections]\nlimit = 3\n",
        )
        .unwrap();
        let defaults = ScoringConfig::default();

        assert!(approx(scoring.shared_tags.cap, 0.7));
        assert!(approx(scoring.shared_tags.base, defaults.shared_tags.base));
        assert_eq!(scoring.shared_tags.limit, defaults.shared_tags.limit);
        assert_eq!(scoring.mutual_connections.limit, 3);
        assert!(approx(
            scoring.mutual_connections.factor,
            defaults.mutual_connections.factor
        ));
        assert_eq!(scoring.same_community, defaults.same_community);
        assert_eq!(scoring.temporal, defaults.temporal);
    }

    #[test]
    fn test_empty_table_is_default() {
        let scoring: ScoringConfig = toml::from_str("").unwrap();
        assert_eq!(scoring, ScoringConfig::default());
    }

    #[test]
    fn test_default_validates() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cap_of_one_rejected() {
        let mut scoring = ScoringConfig::default();
        scoring.shared_tags.cap = 1.0;
        assert!(matches!(scoring.validate(), Err(Error::InvalidInput(msg)) if msg.contains("shared_tags")));
    }

    #[test]
    fn test_negative_window_rejected() {
        let mut scoring = ScoringConfig::default();
        scoring.temporal.modified_window_days = -1.0;
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let scoring: ScoringConfig = toml::from_str(
            "[temporal]\ncreated_window_days = 14.0\n",
        )
        .unwrap();
        assert!(approx(scoring.temporal.created_window_days, 14.0));
        assert!(approx(scoring.temporal.modified_window_days, 3.0));
        assert_eq!(scoring.shared_tags.limit, 10);
    }
}
