//! Terminal record of a practice session and its human-facing summary.

use std::fmt;

/// Proficiency level reported with a completed mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Level {
    Tiro,
    Proficiens,
    Peritus,
}

impl Level {
    /// Maps the agent-reported score to a level. Unrecognized scores fall
    /// back to the middle level rather than failing the session.
    pub fn from_score(score: i64) -> Self {
        match score {
            1 => Level::Tiro,
            3 => Level::Peritus,
            _ => Level::Proficiens,
        }
    }

    fn stars(self) -> usize {
        match self {
            Level::Tiro => 1,
            Level::Proficiens => 2,
            Level::Peritus => 3,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Tiro => "Tiro",
            Level::Proficiens => "Proficiens",
            Level::Peritus => "Peritus",
        };
        write!(f, "{name}")
    }
}

/// Produced exactly once per session and handed to navigation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum SessionResult {
    Incomplete { incomplete: bool },
    Completed {
        score: String,
        level: Level,
        notes: Vec<String>,
    },
}

impl SessionResult {
    pub fn incomplete() -> Self {
        SessionResult::Incomplete { incomplete: true }
    }

    pub fn completed(score: i64, notes: Vec<String>) -> Self {
        SessionResult::Completed {
            score: score.to_string(),
            level: Level::from_score(score),
            notes,
        }
    }
}

/// Renders the post-session summary as plain text.
///
/// A score of "0" marks an ungraded practice session: the feedback list is
/// shown but the star scale is not. This is distinct from the Proficiens
/// fallback used for unrecognized numeric scores.
pub fn render_summary(result: &SessionResult) -> String {
    match result {
        SessionResult::Incomplete { .. } => "\
Mission Ended

You didn't complete the mission objectives.
No score awarded this time.
"
        .to_string(),
        SessionResult::Completed {
            score,
            level,
            notes,
        } => {
            let mut out = String::from("Mission Accomplished!\n\n");
            if score == "0" {
                out.push_str("Practice session complete!\n");
            } else {
                out.push_str(&render_score_scale(*level));
            }
            out.push_str("\nFeedback:\n");
            for note in notes {
                out.push_str(&format!("  - {note}\n"));
            }
            out
        }
    }
}

fn render_score_scale(current: Level) -> String {
    let descriptions = [
        (Level::Tiro, "You needed a lot of help"),
        (Level::Proficiens, "A little help"),
        (Level::Peritus, "No help, fluid"),
    ];

    let mut scale = String::new();
    for (level, _) in descriptions {
        let stars = "★".repeat(level.stars());
        if level == current {
            scale.push_str(&format!("  [{stars} {level}]"));
        } else {
            scale.push_str(&format!("   {stars} {level} "));
        }
    }
    scale.push('\n');

    let description = descriptions
        .iter()
        .find(|(level, _)| *level == current)
        .map(|(_, d)| *d)
        .unwrap_or_default();
    scale.push_str(&format!("  ({description})\n"));
    scale
}
