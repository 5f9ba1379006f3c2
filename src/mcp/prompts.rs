//! Prompt templates offered to MCP clients.

use std::collections::HashMap;

/// Name of the prompt that routes a question to the reasoning tool
pub const ASK_PROMPT_NAME: &str = "ask_deepseek";

/// Text of the `ask_deepseek` prompt
pub fn ask_deepseek_text(prompt: &str) -> String {
    format!("Ask deepseek-r1 with user's prompt:\n{}\n", prompt)
}

/// A named prompt argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// A prompt template rendered into a single user message
#[derive(Clone)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
    render: fn(&HashMap<String, String>) -> Result<String, String>,
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl Prompt {
    /// Render the template, failing when a required argument is missing
    pub fn render(&self, args: &HashMap<String, String>) -> Result<String, String> {
        for argument in self.arguments.iter().filter(|a| a.required) {
            if !args.contains_key(argument.name) {
                return Err(format!("Missing '{}' argument", argument.name));
            }
        }
        (self.render)(args)
    }
}

/// Registry for all prompts
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Prompt>,
}

impl PromptRegistry {
    /// Registry with the built-in prompts
    pub fn builtin() -> Self {
        let mut registry = Self::default();

        registry.register(Prompt {
            name: ASK_PROMPT_NAME.to_string(),
            description: "Ask deepseek-r1 to think about the user's prompt".to_string(),
            arguments: vec![PromptArgument {
                name: "prompt",
                description: "The user's full prompt",
                required: true,
            }],
            render: |args| {
                let prompt = args.get("prompt").map(String::as_str).unwrap_or_default();
                Ok(ask_deepseek_text(prompt))
            },
        });

        registry
    }

    pub fn register(&mut self, prompt: Prompt) {
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    pub fn all(&self) -> Vec<&Prompt> {
        self.prompts.values().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Prompt> {
        self.prompts.get(name)
    }

    /// Render a prompt by name
    pub fn render(&self, name: &str, args: &HashMap<String, String>) -> Result<String, String> {
        self.get(name)
            .ok_or_else(|| format!("Prompt '{}' not found", name))?
            .render(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(prompt: &str) -> HashMap<String, String> {
        HashMap::from([("prompt".to_string(), prompt.to_string())])
    }

    #[test]
    fn test_ask_deepseek_text() {
        assert_eq!(
            ask_deepseek_text("Why is the sky blue?"),
            "Ask deepseek-r1 with user's prompt:\nWhy is the sky blue?\n"
        );
    }

    #[test]
    fn test_render_builtin() {
        let registry = PromptRegistry::builtin();
        assert_eq!(registry.all().len(), 1);

        let text = registry.render(ASK_PROMPT_NAME, &args("2+2=?")).unwrap();
        assert_eq!(text, "Ask deepseek-r1 with user's prompt:\n2+2=?\n");

        let text = registry.render(ASK_PROMPT_NAME, &args("")).unwrap();
        assert_eq!(text, "Ask deepseek-r1 with user's prompt:\n\n");
    }

    #[test]
    fn test_render_missing_argument() {
        let registry = PromptRegistry::builtin();
        let err = registry
            .render(ASK_PROMPT_NAME, &HashMap::new())
            .unwrap_err();
        assert_eq!(err, "Missing 'prompt' argument");
    }

    #[test]
    fn test_render_unknown_prompt() {
        let registry = PromptRegistry::builtin();
        assert!(registry.render("nope", &args("x")).is_err());
    }
}
