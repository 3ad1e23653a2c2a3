//! Prompt templates for document summarization

/// Texts with fewer non-whitespace characters are returned as their own summary
pub const MIN_SUMMARIZABLE_CHARS: usize = 50;

const TRUNCATION_MARKER: &str = "\n\n[Document truncated]";

/// Prompt builder for summary requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instruction for chat-style backends
    pub const SYSTEM_PROMPT: &'static str = "You are a helpful assistant that creates clear, \
        comprehensive summaries of documents. Focus on extracting the most important \
        information and presenting it in an organized way.";

    /// Build the user prompt, truncating the document to `max_chars` characters
    pub fn build_summary_prompt(content: &str, max_chars: usize) -> String {
        format!(
            r#"Please provide a comprehensive summary of the following document. Focus on:
1. Main topics and key points
2. Important findings or conclusions
3. Significant data or statistics if present
4. Overall purpose and context of the document

Make the summary clear, concise, and well-structured.

Document content:

{content}"#,
            content = Self::truncate(content.trim(), max_chars),
        )
    }

    /// Build a single prompt for completion-style backends (no system role)
    pub fn build_completion_prompt(content: &str, max_chars: usize) -> String {
        format!(
            "{}\n\n{}\n\nSummary:",
            Self::SYSTEM_PROMPT,
            Self::build_summary_prompt(content, max_chars)
        )
    }

    /// Return the text itself when it is too short to be worth summarizing
    pub fn short_text_summary(content: &str) -> Option<String> {
        let significant = content.chars().filter(|c| !c.is_whitespace()).count();
        if significant < MIN_SUMMARIZABLE_CHARS {
            let trimmed = content.trim();
            Some(if trimmed.is_empty() {
                "No text could be extracted from the PDF.".to_string()
            } else {
                trimmed.to_string()
            })
        } else {
            None
        }
    }

    fn truncate(content: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
        match content.char_indices().nth(max_chars) {
            Some((idx, _)) => {
                tracing::debug!(
                    "Truncating document text from {} bytes to {} characters",
                    content.len(),
                    max_chars
                );
                format!("{}{}", &content[..idx], TRUNCATION_MARKER).into()
            }
            None => content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_content() {
        let prompt = PromptBuilder::build_summary_prompt("Quarterly revenue grew 12%.", 1000);
        assert!(prompt.contains("Main topics and key points"));
        assert!(prompt.ends_with("Quarterly revenue grew 12%."));
    }

    #[test]
    fn test_prompt_truncates_on_char_boundary() {
        let content = "é".repeat(100);
        let prompt = PromptBuilder::build_summary_prompt(&content, 10);
        assert!(prompt.ends_with(TRUNCATION_MARKER));
        assert!(prompt.contains(&"é".repeat(10)));
        assert!(!prompt.contains(&"é".repeat(11)));
    }

    #[test]
    fn test_completion_prompt_has_instructions() {
        let prompt = PromptBuilder::build_completion_prompt("text", 100);
        assert!(prompt.starts_with(PromptBuilder::SYSTEM_PROMPT));
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn test_short_text_is_its_own_summary() {
        assert_eq!(
            PromptBuilder::short_text_summary("  Invoice #42  ").as_deref(),
            Some("Invoice #42")
        );
        assert!(PromptBuilder::short_text_summary(&"word ".repeat(20)).is_none());
    }
}
