use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a tag does not name a known enumeration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// The eight forms of capital an Assessment can attribute impact to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capital {
    Living,
    Social,
    Material,
    Financial,
    Intellectual,
    Experiential,
    Spiritual,
    Cultural,
}

impl Capital {
    pub const ALL: [Capital; 8] = [
        Capital::Living,
        Capital::Social,
        Capital::Material,
        Capital::Financial,
        Capital::Intellectual,
        Capital::Experiential,
        Capital::Spiritual,
        Capital::Cultural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capital::Living => "living",
            Capital::Social => "social",
            Capital::Material => "material",
            Capital::Financial => "financial",
            Capital::Intellectual => "intellectual",
            Capital::Experiential => "experiential",
            Capital::Spiritual => "spiritual",
            Capital::Cultural => "cultural",
        }
    }
}

impl FromStr for Capital {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Capital::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownVariant {
                kind: "capital",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for Capital {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an Assessment measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Biodiversity,
    Soil,
    Water,
    Carbon,
    Community,
    Economic,
}

impl AssessmentKind {
    pub const ALL: [AssessmentKind; 6] = [
        AssessmentKind::Biodiversity,
        AssessmentKind::Soil,
        AssessmentKind::Water,
        AssessmentKind::Carbon,
        AssessmentKind::Community,
        AssessmentKind::Economic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Biodiversity => "biodiversity",
            AssessmentKind::Soil => "soil",
            AssessmentKind::Water => "water",
            AssessmentKind::Carbon => "carbon",
            AssessmentKind::Community => "community",
            AssessmentKind::Economic => "economic",
        }
    }
}

impl FromStr for AssessmentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AssessmentKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownVariant {
                kind: "assessment kind",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_capitals() {
        assert_eq!(Capital::ALL.len(), 8);
    }

    #[test]
    fn capital_parse_is_case_insensitive() {
        assert_eq!("Living".parse::<Capital>().unwrap(), Capital::Living);
        assert_eq!(" CULTURAL ".parse::<Capital>().unwrap(), Capital::Cultural);
    }

    #[test]
    fn unknown_capital_rejected() {
        let err = "natural".parse::<Capital>().unwrap_err();
        assert_eq!(err.kind, "capital");
        assert!(err.to_string().contains("natural"));
    }

    #[test]
    fn assessment_kind_serde_matches_parse() {
        let json = serde_json::to_string(&AssessmentKind::Biodiversity).unwrap();
        assert_eq!(json, "\"biodiversity\"");
        assert_eq!(
            "biodiversity".parse::<AssessmentKind>().unwrap(),
            AssessmentKind::Biodiversity
        );
    }
}
