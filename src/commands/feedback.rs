use colored::Colorize;

use contextforge::config::Config;
use contextforge::context::ContextRegistry;
use contextforge::error::Result;
use contextforge::feedback::{record_outcome, Outcome};
use contextforge::refine::RefinementKind;
use contextforge::renderer::prompt;
use contextforge::store;

pub fn cmd_feedback(
    config: &Config,
    project: &str,
    problem: &str,
    worked: bool,
    kind: RefinementKind,
    tried_prompt: Option<String>,
    refinement_id: Option<String>,
) -> Result<()> {
    let registry = ContextRegistry::load(&config.contexts_dir)?;
    let context = registry.get(project)?;
    let problem = prompt::validate_problem(problem)?;

    let outcome = Outcome {
        project_id: context.id.clone(),
        problem: problem.to_string(),
        prompt: tried_prompt.unwrap_or_else(|| prompt::compose(problem, None, context)),
        kind,
        refinement_id,
        worked,
    };

    let store = store::open(config);
    super::runtime()?.block_on(record_outcome(store.as_ref(), &outcome))?;

    if worked {
        println!(
            "{} Recorded a working solution for {}.",
            "Done!".green().bold(),
            context.name.cyan()
        );
    } else {
        println!("{} Recorded that it did not work.", "Done!".green().bold());
    }
    Ok(())
}
