//! Prompt templates for LLM interactions

use super::client::ChatRequest;
use crate::extract::UnitKind;

/// Prompt for summarizing one unit
pub struct SummaryPrompt;

impl SummaryPrompt {
    /// System prompt for a unit kind
    pub fn system_prompt(role: UnitKind) -> &'static str {
        match role {
            UnitKind::Function => FUNCTION_SUMMARY_PROMPT,
            UnitKind::Class => CLASS_SUMMARY_PROMPT,
            UnitKind::Method => METHOD_SUMMARY_PROMPT,
        }
    }

    /// Build the request summarizing `code`
    pub fn request(code: &str, role: UnitKind) -> ChatRequest {
        ChatRequest::new(Self::system_prompt(role))
            .with_user(&format!("Input:\n{}\n\nSummary:", code))
    }
}

/// Prompt for answering a question from retrieved context
pub struct AnswerPrompt;

impl AnswerPrompt {
    /// Build the request answering `question` from `context`
    pub fn request(question: &str, context: &str) -> ChatRequest {
        let mut prompt = String::new();

        prompt.push_str("## Context\n\n");
        if context.is_empty() {
            prompt.push_str("(no relevant code was found)\n\n");
        } else {
            prompt.push_str(context);
        }

        prompt.push_str("## Question\n\n");
        prompt.push_str(question);
        prompt.push('\n');

        ChatRequest::new(ANSWER_SYSTEM_PROMPT).with_user(&prompt)
    }
}

const FUNCTION_SUMMARY_PROMPT: &str = r#"You are an expert at reading Python code and summarizing functions.

Summarize the function given after the "Input" key. Use its name, arguments, docstring, comments and body to write a short but informative description of what it does and what it returns.

Write only the summary, after the "Summary" key."#;

const CLASS_SUMMARY_PROMPT: &str = r#"You are an expert at reading Python code and summarizing classes.

Summarize the class given after the "Input" key. Describe what the class represents, the state it holds, and what its methods let a caller do. Use its name, base classes, docstrings and comments.

Write only the summary, after the "Summary" key."#;

const METHOD_SUMMARY_PROMPT: &str = r#"You are an expert at reading Python code and summarizing methods.

Summarize the method given after the "Input" key. It belongs to a class; describe what it does with the instance and its arguments, any attributes it reads or changes, and what it returns.

Write only the summary, after the "Summary" key."#;

const ANSWER_SYSTEM_PROMPT: &str = r#"You are a helpful and honest assistant that answers questions about a codebase.

You are given a context of code units. Each entry starts with an identifier in square brackets, followed by the unit's name and a summary of what it does.

Guidelines:
- Answer only from the context. If it does not contain the answer, say so.
- When a statement relies on a unit, cite it with its identifier in square brackets, for example [functions_3].
- Use the identifiers exactly as written. Do not invent identifiers.
- Keep the answer concise."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_per_role() {
        let function = SummaryPrompt::request("def f(): pass", UnitKind::Function);
        let method = SummaryPrompt::request("    def m(self): pass", UnitKind::Method);

        assert!(function.messages[0].content.contains("summarizing functions"));
        assert!(method.messages[0].content.contains("summarizing methods"));
        assert!(SummaryPrompt::system_prompt(UnitKind::Class).contains("summarizing classes"));

        assert_eq!(function.messages.len(), 2);
        assert_eq!(function.messages[1].role, "user");
        assert!(function.messages[1].content.starts_with("Input:\ndef f(): pass"));
    }

    #[test]
    fn test_answer_prompt_generation() {
        let context = "[functions_1]: Name - send, Summary - Sends a message\n\n";
        let request = AnswerPrompt::request("How do I send a message?", context);

        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("[functions_3]"));
        assert!(request.contains("[functions_1]: Name - send"));
        assert!(request.contains("How do I send a message?"));
    }

    #[test]
    fn test_answer_prompt_without_context() {
        let request = AnswerPrompt::request("Anything?", "");
        assert!(request.contains("no relevant code was found"));
    }
}
