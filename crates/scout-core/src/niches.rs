use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Closed set of creator content categories.
///
/// Declaration order doubles as tie-break priority: when two labels score the
/// same, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Niche {
    Fitness,
    Fashion,
    Tech,
    Gaming,
    Food,
    Travel,
    Business,
    Education,
    Entertainment,
    Lifestyle,
    Beauty,
    Health,
    Finance,
    Sports,
    Art,
    Music,
    Parenting,
    Diy,
    Photography,
    Unknown,
}

impl Niche {
    /// Every classifiable label in priority order. `Unknown` is excluded.
    pub const LABELS: [Niche; 19] = [
        Niche::Fitness,
        Niche::Fashion,
        Niche::Tech,
        Niche::Gaming,
        Niche::Food,
        Niche::Travel,
        Niche::Business,
        Niche::Education,
        Niche::Entertainment,
        Niche::Lifestyle,
        Niche::Beauty,
        Niche::Health,
        Niche::Finance,
        Niche::Sports,
        Niche::Art,
        Niche::Music,
        Niche::Parenting,
        Niche::Diy,
        Niche::Photography,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Niche::Fitness => "fitness",
            Niche::Fashion => "fashion",
            Niche::Tech => "tech",
            Niche::Gaming => "gaming",
            Niche::Food => "food",
            Niche::Travel => "travel",
            Niche::Business => "business",
            Niche::Education => "education",
            Niche::Entertainment => "entertainment",
            Niche::Lifestyle => "lifestyle",
            Niche::Beauty => "beauty",
            Niche::Health => "health",
            Niche::Finance => "finance",
            Niche::Sports => "sports",
            Niche::Art => "art",
            Niche::Music => "music",
            Niche::Parenting => "parenting",
            Niche::Diy => "diy",
            Niche::Photography => "photography",
            Niche::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self != Niche::Unknown
    }
}

impl std::fmt::Display for Niche {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Niche {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "other" || lowered == "unknown" {
            return Ok(Niche::Unknown);
        }
        Niche::LABELS
            .into_iter()
            .find(|n| n.as_str() == lowered)
            .ok_or_else(|| CoreError::UnknownNiche(s.to_string()))
    }
}
