//! Prompt templates for patch requests.

use minijinja::{Environment, context};
use restyle_core::generative::PatchRequest;
use restyle_core::{RestyleError, Result};

const SYSTEM_TEMPLATE: &str = r#"You edit a single element of a live web page.
Reply with one JSON object and nothing else:
{"styleChanges": "<css declarations>", "contentChanges": "<replacement html or empty>", "rationale": "<one or two sentences>"}
{%- if edit %}
Rules:
- styleChanges holds inline CSS declarations separated by semicolons, without selectors or braces.
- contentChanges replaces the whole element, so include the outer tag. Leave it empty for style-only edits.
- Never emit scripts, event handler attributes, iframes or javascript: URLs.
{%- else %}
The operator is asking a question about the page. Answer in rationale and leave styleChanges and contentChanges empty.
{%- endif %}"#;

const USER_TEMPLATE: &str = r#"Instruction: {{ instruction }}
{%- if context %}

Target: <{{ context.tag }}> at `{{ context.address }}`

Markup:
{{ context.markupExcerpt }}

Computed styles:
{%- for name, value in context.effectiveStyles|items %}
{{ name }}: {{ value }}
{%- endfor %}
{%- if context.matchingRuleText %}

Matching rules:
{{ context.matchingRuleText }}
{%- endif %}
{%- endif %}"#;

/// Renders the prompts sent with every patch request.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    /// # Errors
    ///
    /// Returns `RestyleError::Internal` if a built-in template fails to compile.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE).map_err(template_error)?;
        env.add_template("user", USER_TEMPLATE).map_err(template_error)?;
        Ok(Self { env })
    }

    /// System prompt. Edit instructions when a target context is present,
    /// question answering otherwise.
    pub fn system(&self, request: &PatchRequest) -> Result<String> {
        self.env
            .get_template("system")
            .and_then(|t| t.render(context! { edit => request.context.is_some() }))
            .map_err(template_error)
    }

    /// User message carrying the instruction and the target snapshot.
    pub fn user(&self, request: &PatchRequest) -> Result<String> {
        self.env
            .get_template("user")
            .and_then(|t| {
                t.render(context! {
                    instruction => &request.instruction,
                    context => &request.context,
                })
            })
            .map_err(template_error)
    }
}

fn template_error(e: minijinja::Error) -> RestyleError {
    RestyleError::internal(format!("prompt template: {}", e))
}
