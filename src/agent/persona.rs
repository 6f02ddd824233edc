use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, Result};

/// A named role that reframes the task into its own prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub id: String,
    pub display_name: String,
    pub role_prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<RawPersona>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPersona {
    id: String,
    #[serde(alias = "name")]
    display_name: String,
    role_prompt: String,
}

/// Load and validate the ordered persona list. JSON unless the file ends in `.toml`.
pub fn load(path: &Path) -> Result<Vec<Persona>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Persona(format!("Failed to read {}: {e}", path.display()))
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let personas = if is_toml {
        parse_toml(&text)
    } else {
        parse_json(&text)
    }
    .map_err(|e| match e {
        AppError::Persona(msg) => AppError::Persona(format!("{}: {msg}", path.display())),
        other => other,
    })?;

    tracing::info!(path = %path.display(), count = personas.len(), "Loaded personas");
    Ok(personas)
}

pub fn parse_json(text: &str) -> Result<Vec<Persona>> {
    let file: PersonaFile =
        serde_json::from_str(text).map_err(|e| AppError::Persona(format!("invalid JSON: {e}")))?;
    validate(file.personas)
}

pub fn parse_toml(text: &str) -> Result<Vec<Persona>> {
    let file: PersonaFile =
        toml::from_str(text).map_err(|e| AppError::Persona(format!("invalid TOML: {e}")))?;
    validate(file.personas)
}

fn validate(raw: Vec<RawPersona>) -> Result<Vec<Persona>> {
    let mut seen = HashSet::new();
    let mut personas = Vec::with_capacity(raw.len());

    for (index, p) in raw.into_iter().enumerate() {
        let id = p.id.trim().to_string();
        // Ids become branch name components.
        if id.is_empty()
            || id.starts_with(['.', '-'])
            || id.contains("..")
            || id.ends_with(".lock")
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(AppError::Persona(format!(
                "persona #{index}: invalid id {:?} (use letters, digits, '-', '_', '.')",
                p.id
            )));
        }
        if !seen.insert(id.clone()) {
            return Err(AppError::Persona(format!(
                "persona #{index}: duplicate id {id:?}"
            )));
        }
        if p.display_name.trim().is_empty() {
            return Err(AppError::Persona(format!(
                "persona {id:?}: empty display name"
            )));
        }
        if p.role_prompt.trim().is_empty() {
            return Err(AppError::Persona(format!(
                "persona {id:?}: empty role_prompt"
            )));
        }

        personas.push(Persona {
            id,
            display_name: p.display_name.trim().to_string(),
            role_prompt: p.role_prompt,
        });
    }

    Ok(personas)
}
