//! Prompt templates for Spor.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt for answering a question from retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// Template with `{{question}}` and `{{context}}` placeholders.
    pub answer: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            answer: r#"You are a helpful assistant that can answer questions about content based on the provided context.

Answer the following question: {{question}}
By searching the following context: {{context}}

Only use the factual information from the context to answer the question.

If you feel like you don't have enough information to answer the question, say "I don't know".

Your answers should be verbose and detailed."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template, so values that happen
    /// to contain `{{...}}` (retrieved text, user questions) are never expanded.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);

        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_has_placeholders() {
        let prompts = Prompts::default();
        assert!(prompts.rag.answer.contains("{{question}}"));
        assert!(prompts.rag.answer.contains("{{context}}"));
        assert!(prompts.rag.answer.contains("I don't know"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "what is {{context}}?".to_string());
        vars.insert("context".to_string(), "secret".to_string());

        let result = Prompts::render("Q: {{question}} C: {{context}}", &vars);
        assert_eq!(result, "Q: what is {{context}}? C: secret");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let vars = HashMap::new();
        assert_eq!(Prompts::render("a {{missing}} b {{", &vars), "a {{missing}} b {{");
    }

    #[test]
    fn test_custom_variables_are_overridden_by_provided() {
        let mut custom = HashMap::new();
        custom.insert("tone".to_string(), "formal".to_string());
        custom.insert("question".to_string(), "ignored".to_string());

        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "why?".to_string());

        let result = prompts.render_with_custom("{{tone}}: {{question}}", &vars);
        assert_eq!(result, "formal: why?");
    }

    #[test]
    fn test_load_custom_rag_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "answer = \"Context: {{context}}\\nQuestion: {{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert!(prompts.rag.answer.starts_with("Context: {{context}}"));
    }
}
