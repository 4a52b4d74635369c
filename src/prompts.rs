//! Instruction templates for derived product content.
//!
//! Centralising the templates here keeps the prompt wording in exactly
//! one place and lets unit tests inspect it without a running service.
//! Callers override the default via
//! [`crate::config::PipelineConfig::task_instruction`].

/// Default task instruction used when the caller supplies none.
pub const DEFAULT_TASK_INSTRUCTION: &str =
    "Provide a concise description of the product or service presented in the context. \
     State what it is, who it is for, and its key capabilities. \
     Use only information found in the context.";

/// Render the final prompt from context text and the task instruction.
///
/// Layout: optional `Source:` line, then the extracted context, then the
/// task. The context comes first so the instruction is the last thing
/// the model reads before generating.
pub fn render_prompt(identifier: Option<&str>, context: &str, instruction: &str) -> String {
    let mut prompt = String::with_capacity(context.len() + instruction.len() + 64);
    if let Some(id) = identifier {
        prompt.push_str("Source: ");
        prompt.push_str(id);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Context:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nTask: ");
    prompt.push_str(instruction);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_layout_without_metadata() {
        let p = render_prompt(None, "Acme widget datasheet", "Describe the product.");
        assert!(p.starts_with("Context:\n"));
        assert!(p.ends_with("Task: Describe the product."));
        assert!(!p.contains("Source:"));
    }

    #[test]
    fn prompt_layout_with_metadata() {
        let p = render_prompt(Some("catalog.pdf"), "ctx", "task");
        assert!(p.starts_with("Source: catalog.pdf\n\n"));
        assert!(p.contains("Context:\nctx"));
    }

    #[test]
    fn default_instruction_is_nonempty() {
        assert!(!DEFAULT_TASK_INSTRUCTION.trim().is_empty());
    }
}
