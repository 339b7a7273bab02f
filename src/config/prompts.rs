//! Prompt templates for Callscope.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub reasoning: ReasoningPrompts,
    pub analysis: AnalysisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for grounded question answering about one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ReasoningPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a causal analysis expert for call-center conversations.

Guidelines:
- Answer using only the transcript context you are given
- If the information is not in the context, say you don't know
- Keep answers short and specific
- Use earlier questions in the conversation to resolve follow-ups"#
                .to_string(),

            user: r#"Use the following transcript to answer the user's question.

Transcript: {{transcript_id}}
Intent: {{intent}}
Transcript context: {{reason_for_call}}

User Query: {{query}}

Constraint: Your answer must be FAITHFUL to the transcript. If the information isn't there, say you don't know."#
                .to_string(),
        }
    }
}

/// Prompts for finding the turn that caused a call's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You analyze call-center transcripts to find the single turn that most directly caused the outcome of the call.

Respond with a JSON object only."#
                .to_string(),

            user: r#"The customer called with intent: {{intent}}
Reason for call: {{reason_for_call}}

Conversation:
{{conversation}}

Identify the turn index that most directly led to the outcome, and explain why.

Respond with a JSON object of this form:
{"causal_turn_index": 4, "reasoning": "In Turn 4, the agent ignored the refund request, which led to the escalation."}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let reasoning_path = custom_path.join("reasoning.toml");
            if reasoning_path.exists() {
                let content = std::fs::read_to_string(&reasoning_path)?;
                prompts.reasoning = toml::from_str(&content)?;
            }

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in one pass over the template, so values
    /// are inserted literally. Unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
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
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.reasoning.user.contains("{{reason_for_call}}"));
        assert!(prompts.reasoning.user.contains("{{query}}"));
        assert!(prompts.analysis.user.contains("{{conversation}}"));
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
    fn test_render_inserts_values_literally() {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "what is {{intent}}?".to_string());
        vars.insert("intent".to_string(), "refund".to_string());

        for _ in 0..50 {
            let rendered = Prompts::render("Intent: {{intent}}\nQuery: {{query}}", &vars);
            assert_eq!(rendered, "Intent: refund\nQuery: what is {{intent}}?");
        }
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let vars = HashMap::new();
        assert_eq!(Prompts::render("Hi {{name}}", &vars), "Hi {{name}}");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("company".to_string(), "Acme".to_string());
        prompts.variables.insert("query".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "why?".to_string());

        let rendered = prompts.render_with_custom("{{company}}: {{query}}", &vars);
        assert_eq!(rendered, "Acme: why?");
    }

    #[test]
    fn test_load_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reasoning.toml"),
            "system = \"custom system\"\nuser = \"Q: {{query}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.reasoning.system, "custom system");
        assert_eq!(prompts.analysis.system, AnalysisPrompts::default().system);
    }
}
