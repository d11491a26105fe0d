use anyhow::{Context, Result};
use immergo_core::mission::InteractionMode;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Loads every `.md` file in `dir_path` as an instruction template, keyed by
/// file stem. Placeholders inside the files stay untouched; rendering happens
/// at session start against the mission context.
pub fn load_templates(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut templates = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            templates.insert(key, content);
        }
    }

    Ok(templates)
}

/// Picks the template for a mission's interaction mode.
pub fn template_for_mode<'a>(
    templates: &'a HashMap<String, String>,
    mode: &InteractionMode,
) -> Result<&'a String> {
    let key = match mode {
        InteractionMode::Immersive => "immersive",
        InteractionMode::Teacher => "teacher",
    };
    templates
        .get(key)
        .with_context(|| format!("No instruction template named '{key}.md' in prompts/"))
}
