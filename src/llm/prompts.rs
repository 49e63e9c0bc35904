use crate::refine::{MemoryEntry, RefinementKind};

pub const NOT_AVAILABLE: &str = "Not available";
pub const NO_PRIOR_SOLUTIONS: &str = "No prior solutions documented for this pattern.";
pub const PRIOR_SOLUTIONS_HEADER: &str = "Prior solutions that worked:";

const SYSTEM_SPECIFIC: &str = r#"You are a prompt engineering specialist for Claude.
Your job is to refine prompts to be MUCH MORE SPECIFIC and TECHNICAL.

Analyze the original prompt and:
1. Identify the core problem
2. Add the missing technical details
3. Ask for more precise information (e.g. "What exactly is the error?")
4. Mention the specific tech stack (language, framework, version)
5. Give very clear STEP-BY-STEP instructions

Return ONLY the refined prompt, without explanations."#;

const SYSTEM_CONTEXT: &str = r#"You are a prompt engineering specialist for Claude.
Your job is to add MORE CONTEXT to the prompt.

Analyze the original prompt and:
1. Identify the missing context
2. Add information about the project (structure, patterns, conventions)
3. Include the dependencies and tools in use
4. Describe the current state of the code
5. Explain the BIGGER goal (not only the immediate problem)

Return ONLY the refined prompt, without explanations."#;

const SYSTEM_ALTERNATIVE: &str = r#"You are a prompt engineering specialist for Claude.
Your job is to REFRAME THE PROBLEM with an alternative approach.

Analyze the original prompt and:
1. Identify what was asked
2. Suggest a DIFFERENT approach to solve it
3. Question the assumptions
4. Think "what if we did it another way?"
5. Explore alternatives that were not considered

Return ONLY the refined prompt, without explanations."#;

const SYSTEM_CORRECTION: &str = r#"You are a prompt engineering specialist for Claude.
Your job is to CLARIFY misunderstandings.

Analyze the original prompt and:
1. Identify what may have been misinterpreted
2. Restate the problem with absolute CLARITY
3. Remove ambiguities
4. Define technical terms
5. Make the REAL problem explicit

Return ONLY the refined prompt, without explanations."#;

const SYSTEM_REFINE: &str = r#"You are a prompt engineering specialist for Claude.
Your job is to IMPROVE the quality of the solution.

Analyze the original prompt and:
1. Identify how to improve the expected answer
2. Ask for better structure of the code/answer
3. Include tests and validations
4. Ask for logging/debugging
5. Improve the quality of the final output

Return ONLY the refined prompt, without explanations."#;

/// System instruction for a refinement strategy
pub fn system_prompt(kind: RefinementKind) -> &'static str {
    match kind {
        RefinementKind::Especifico => SYSTEM_SPECIFIC,
        RefinementKind::Contexto => SYSTEM_CONTEXT,
        RefinementKind::Alternativa => SYSTEM_ALTERNATIVE,
        RefinementKind::Correcao => SYSTEM_CORRECTION,
        RefinementKind::Refinar => SYSTEM_REFINE,
    }
}

/// Closing phrase appended to the user message
pub fn closing_phrase(kind: RefinementKind) -> &'static str {
    match kind {
        RefinementKind::Especifico => "MUCH MORE SPECIFIC AND TECHNICAL",
        RefinementKind::Contexto => "RICHER IN CONTEXT",
        RefinementKind::Alternativa => "TAKE A DIFFERENT APPROACH",
        RefinementKind::Correcao => "COMPLETELY CLEAR",
        RefinementKind::Refinar => "OF BETTER QUALITY",
    }
}

/// Render prior solutions, one line per entry in input order
pub fn format_memory(memory: &[MemoryEntry]) -> String {
    if memory.is_empty() {
        return NO_PRIOR_SOLUTIONS.to_string();
    }

    let lines: Vec<String> = memory
        .iter()
        .map(|m| {
            format!(
                "- {}: {} (used {}x)",
                m.problem_type, m.solution, m.times_used
            )
        })
        .collect();
    format!("{}\n{}", PRIOR_SOLUTIONS_HEADER, lines.join("\n"))
}

/// User-role message for a refinement call
pub fn refinement_message(
    original_prompt: &str,
    project_context: &str,
    memory: &[MemoryEntry],
    kind: RefinementKind,
) -> String {
    let context = if project_context.is_empty() {
        NOT_AVAILABLE
    } else {
        project_context
    };

    format!(
        r#"ORIGINAL PROMPT:
{}

PROJECT CONTEXT:
{}

PRIOR SOLUTION MEMORY:
{}

---

Please refine this prompt, making it {}."#,
        original_prompt,
        context,
        format_memory(memory),
        closing_phrase(kind)
    )
}
