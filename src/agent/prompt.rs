use crate::agent::patch::{PATCH_END, PATCH_START};
use crate::agent::persona::Persona;

/// Prompt for one persona: its role, the task, and the marker-protocol answer format.
pub fn patch_prompt(persona: &Persona, task: &str) -> String {
    format!(
        r#"{role}

Task:
{task}

## Answer format
Respond with a unified diff (git format-patch style) that implements the task.
- Use `--- a/<path>`, `+++ b/<path>` and `@@` hunk headers with paths relative to the repository root.
- Put the diff between the markers {PATCH_START} and {PATCH_END}, and nothing else between them.
- If no changes are needed, answer with {PATCH_START} immediately followed by {PATCH_END} on the next line."#,
        role = persona.role_prompt.trim(),
        task = task.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_role_task_and_markers() {
        let persona = Persona {
            id: "tester".to_string(),
            display_name: "Test Engineer".to_string(),
            role_prompt: "You write tests first.\n".to_string(),
        };
        let prompt = patch_prompt(&persona, "  add greeting file ");

        assert!(prompt.starts_with("You write tests first.\n\nTask:\nadd greeting file\n"));
        assert!(prompt.contains("PATCH_START"));
        assert!(prompt.contains("PATCH_END"));
        assert!(prompt.contains("--- a/"));
    }
}
