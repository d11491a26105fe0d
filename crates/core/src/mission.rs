/// How the remote agent behaves during the session: stay fully in character,
/// or break role to explain and translate when the learner struggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Immersive,
    Teacher,
}

impl InteractionMode {
    /// Anything other than "teacher" selects the immersive default.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "teacher" => Self::Teacher,
            _ => Self::Immersive,
        }
    }
}

/// Immutable description of one practice mission. Established once per
/// session via the controller's `configure` call and never mutated after.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MissionContext {
    pub title: String,
    pub desc: String,
    pub target_role: String,
    /// Language being practiced.
    pub language: String,
    /// The learner's native language.
    pub from_language: String,
    pub mode: InteractionMode,
}

impl Default for MissionContext {
    fn default() -> Self {
        Self {
            title: "General Conversation".to_string(),
            desc: String::new(),
            target_role: "a local native speaker".to_string(),
            language: "French".to_string(),
            from_language: "English".to_string(),
            mode: InteractionMode::Immersive,
        }
    }
}
