//! Prompt synthesis from repository facts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown in place of a field the caller left out.
const NOT_PROVIDED: &str = "not provided";

/// Request body of `POST /generate-readme`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmeRequest {
    pub repo_name: Option<PromptField>,
    pub repo_description: Option<PromptField>,
    pub languages: Option<PromptField>,
    pub stars: Option<PromptField>,
    pub topics: Option<PromptField>,
}

/// A loosely typed field value. Callers send languages and topics either as
/// a comma separated string or as a list, and stars as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptField {
    Text(String),
    Number(serde_json::Number),
    List(Vec<PromptField>),
    Other(serde_json::Value),
}

impl fmt::Display for PromptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptField::Text(s) => f.write_str(s),
            PromptField::Number(n) => write!(f, "{}", n),
            PromptField::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            PromptField::Other(value) => write!(f, "{}", value),
        }
    }
}

fn field(value: &Option<PromptField>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NOT_PROVIDED.to_string(),
    }
}

/// Build the completion prompt for a README request.
pub fn build_prompt(request: &ReadmeRequest) -> String {
    format!(
        "Generate a clean, professional, and aesthetic README.md for a GitHub repo.\n\
         Repo name: {}\n\
         Description: {}\n\
         Languages: {}\n\
         Stars: {}\n\
         Topics: {}\n\
         Format beautifully with headings, badges, and sections like Overview, Installation, Usage, and License.",
        field(&request.repo_name),
        field(&request.repo_description),
        field(&request.languages),
        field(&request.stars),
        field(&request.topics),
    )
}
