//! Fills the roleplay instruction templates with mission details.
//!
//! Templates are opaque text with `{placeholder}` markers; which template to
//! use (immersive or teacher) is decided by the mission's interaction mode
//! at the call site.

use crate::mission::MissionContext;

/// Substitutes mission fields into an instruction template.
pub fn render(template: &str, mission: &MissionContext) -> String {
    template
        .replace("{language}", &mission.language)
        .replace("{from_language}", &mission.from_language)
        .replace("{target_role}", &mission.target_role)
        .replace("{mission_title}", &mission.title)
        .replace("{mission_desc}", &mission.desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::InteractionMode;

    fn mission() -> MissionContext {
        MissionContext {
            title: "Order a coffee".to_string(),
            desc: "Ask for an espresso and pay".to_string(),
            target_role: "a barista".to_string(),
            language: "Italian".to_string(),
            from_language: "English".to_string(),
            mode: InteractionMode::Immersive,
        }
    }

    #[test]
    fn all_placeholders_are_substituted() {
        let template = "You are {target_role}, a native speaker of {language}. \
The user (native {from_language}) wants to: \"{mission_title}\" ({mission_desc}).";
        let rendered = render(template, &mission());
        assert_eq!(
            rendered,
            "You are a barista, a native speaker of Italian. \
The user (native English) wants to: \"Order a coffee\" (Ask for an espresso and pay)."
        );
        assert!(!rendered.contains('{'));
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(render("plain text", &mission()), "plain text");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        let rendered = render("{language} {language}", &mission());
        assert_eq!(rendered, "Italian Italian");
    }
}
