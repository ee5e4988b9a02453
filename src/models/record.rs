use serde::{Deserialize, Serialize};

/// Which results screen the screenshot shows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Totals per commander with the boss fought
    Overall,
    /// One boss, with the team each commander used
    BossSpecific,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Overall => write!(f, "Overall"),
            Mode::BossSpecific => write!(f, "Boss Specific"),
        }
    }
}

/// Team composition of a Boss-Specific row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TeamComposition {
    /// Matched reference identifiers, left to right
    Matched(Vec<String>),
    /// Portrait count was wrong, no identities reported
    Unavailable,
}

/// Mode-specific part of a row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RowDetails {
    Overall {
        boss_name: Option<String>,
    },
    BossSpecific {
        team: TeamComposition,
        unit_level: Option<String>,
    },
}

/// One parsed row of the results panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowRecord {
    pub commander_name: Option<String>,
    /// Digits only; `None` when nothing could be isolated, never zero-filled
    pub commander_damage: Option<u64>,
    pub boss_level: Option<u32>,
    pub details: RowDetails,
}

impl RowRecord {
    pub fn mode(&self) -> Mode {
        match self.details {
            RowDetails::Overall { .. } => Mode::Overall,
            RowDetails::BossSpecific { .. } => Mode::BossSpecific,
        }
    }

    /// Damage as shown to a reader: missing values display as 0
    pub fn display_damage(&self) -> u64 {
        self.commander_damage.unwrap_or(0)
    }

    pub fn display_boss_level(&self) -> u32 {
        self.boss_level.unwrap_or(0)
    }
}

/// Text field a parser may fail to read
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BossLevel,
    CommanderDamage,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::BossLevel => write!(f, "boss level"),
            Field::CommanderDamage => write!(f, "commander damage"),
        }
    }
}

/// Recoverable problem attached to a single row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RowIssue {
    PortraitCountMismatch { expected: usize, found: usize },
    UnparseableField { field: Field, raw: String },
    OcrFailed(String),
    PortraitsFailed(String),
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowIssue::PortraitCountMismatch { expected, found } => {
                write!(f, "found {} portraits instead of {}", found, expected)
            }
            RowIssue::UnparseableField { field, raw } => {
                write!(f, "could not read {} from {:?}", field, raw)
            }
            RowIssue::OcrFailed(message) => write!(f, "OCR failed: {}", message),
            RowIssue::PortraitsFailed(message) => write!(f, "portrait identification failed: {}", message),
        }
    }
}

/// A row record plus everything that went wrong while building it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowOutcome {
    pub index: usize,
    pub record: RowRecord,
    pub issues: Vec<RowIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_defaults_do_not_touch_parsed_values() {
        let record = RowRecord {
            commander_name: Some("CmdrX".to_string()),
            commander_damage: None,
            boss_level: None,
            details: RowDetails::Overall { boss_name: None },
        };

        assert_eq!(record.display_damage(), 0);
        assert_eq!(record.display_boss_level(), 0);
        assert_eq!(record.commander_damage, None, "null must stay null");
    }

    #[test]
    fn test_record_mode() {
        let record = RowRecord {
            commander_name: None,
            commander_damage: Some(10),
            boss_level: Some(3),
            details: RowDetails::BossSpecific {
                team: TeamComposition::Unavailable,
                unit_level: None,
            },
        };
        assert_eq!(record.mode(), Mode::BossSpecific);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Overall).unwrap(), "\"overall\"");
        assert_eq!(
            serde_json::to_string(&Mode::BossSpecific).unwrap(),
            "\"boss-specific\""
        );
    }

    #[test]
    fn test_issue_messages() {
        let issue = RowIssue::PortraitCountMismatch { expected: 6, found: 4 };
        assert_eq!(issue.to_string(), "found 4 portraits instead of 6");
    }
}
