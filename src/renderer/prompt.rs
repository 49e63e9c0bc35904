use crate::context::ProjectContext;
use crate::error::{ForgeError, Result};

/// Shortest problem description worth composing a prompt for
pub const MIN_PROBLEM_CHARS: usize = 20;

pub const CONTEXT_PLACEHOLDER: &str = "(Project context not filled in)";
pub const ARCHITECTURE_PLACEHOLDER: &str = "(Architecture not filled in)";
pub const CHANGES_GUIDE_PLACEHOLDER: &str = "(Change guide not filled in)";
pub const CONVENTIONS_PLACEHOLDER: &str = "- Follow the project's conventions";
pub const KEY_FILES_PLACEHOLDER: &str = "- Check the project documentation";

const SECTION_RULE: &str = "\n\n---\n\n";

/// Check a problem description before composing. Returns the trimmed text.
pub fn validate_problem(problem: &str) -> Result<&str> {
    let trimmed = problem.trim();
    let len = trimmed.chars().count();
    if len < MIN_PROBLEM_CHARS {
        return Err(ForgeError::InvalidProblem(format!(
            "must be at least {} characters (got {})",
            MIN_PROBLEM_CHARS, len
        )));
    }
    Ok(trimmed)
}

/// Render the prompt document for `problem` in the given project.
///
/// Pure and deterministic: identical inputs always render identical text.
/// Absent or empty context fields are replaced by placeholders.
pub fn compose(problem: &str, file_hint: Option<&str>, context: &ProjectContext) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str(&format!(
        "# {} - RESOLVE PROBLEM\n\n",
        context.name.to_uppercase()
    ));

    out.push_str("## 📋 PROBLEM\n");
    out.push_str(problem);
    if let Some(file) = file_hint.map(str::trim).filter(|f| !f.is_empty()) {
        out.push_str(&format!("\n**Main File:** {}", file));
    }
    out.push_str(SECTION_RULE);

    out.push_str("## 📚 PROJECT CONTEXT\n");
    out.push_str(or_placeholder(&context.project_context, CONTEXT_PLACEHOLDER));
    out.push_str(SECTION_RULE);

    out.push_str("## 🏗️ ARCHITECTURE\n");
    out.push_str(or_placeholder(&context.architecture, ARCHITECTURE_PLACEHOLDER));
    out.push_str(SECTION_RULE);

    out.push_str("## ✅ CONVENTIONS TO FOLLOW\n");
    out.push_str(&bullets(&context.conventions, |c| format!("- {}", c), CONVENTIONS_PLACEHOLDER));
    out.push_str(SECTION_RULE);

    out.push_str("## 🔍 KEY FILES\n");
    out.push_str(&bullets(&context.key_files, |f| format!("- `{}`", f), KEY_FILES_PLACEHOLDER));
    out.push_str(SECTION_RULE);

    out.push_str("## 📝 CHANGE GUIDE\n");
    out.push_str(or_placeholder(&context.changes_guide, CHANGES_GUIDE_PLACEHOLDER));
    out.push_str(SECTION_RULE);

    out.push_str(
        "## 🎯 INSTRUCTIONS FOR THE ASSISTANT\n\n\
         1. BEFORE: Read ALL the context, understand the conventions\n\
         2. DURING: Follow the conventions, add logs\n\
         3. AFTER: Test, validate, document\n\
         4. IF STUCK: Consult the change guide\n\n\
         **Generated by ContextForge** ✨",
    );

    out
}

fn or_placeholder<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
}

fn bullets(items: &[String], fmt: impl Fn(&str) -> String, placeholder: &str) -> String {
    if items.is_empty() {
        return placeholder.to_string();
    }
    items
        .iter()
        .map(|item| fmt(item.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}
