use std::path::Path;

use colored::Colorize;

use contextforge::config::Config;
use contextforge::context::ContextRegistry;
use contextforge::error::Result;
use contextforge::history::History;
use contextforge::renderer::prompt;

pub fn cmd_projects(config: &Config) -> Result<()> {
    let registry = ContextRegistry::load(&config.contexts_dir)?;

    if registry.is_empty() {
        eprintln!(
            "{} No project contexts in {}",
            "Not found:".yellow(),
            config.contexts_dir.display()
        );
        eprintln!("  Add one JSON file per project (see contexts/ in the repository).");
        return Ok(());
    }

    println!("{}", "Projects".green().bold());
    println!("{}", "=".repeat(50));
    for context in registry.iter() {
        println!("  {}\t{}", context.id.cyan().bold(), context.label());
        if let Some(desc) = context.description.as_deref().filter(|d| !d.is_empty()) {
            println!("  \t{}", desc.dimmed());
        }
    }

    Ok(())
}

pub fn cmd_compose(
    config: &Config,
    project: &str,
    problem: &str,
    file: Option<&str>,
    output: Option<&Path>,
    no_history: bool,
) -> Result<()> {
    let registry = ContextRegistry::load(&config.contexts_dir)?;
    let context = registry.get(project)?;
    let problem = prompt::validate_problem(problem)?;

    let text = prompt::compose(problem, file, context);
    println!("{}", text);

    if let Some(path) = output {
        std::fs::write(path, &text)?;
        eprintln!("{} Prompt written to {}", "Saved".green().bold(), path.display());
    }

    if !no_history {
        let id = remember(config, &context.name, problem, file)?;
        eprintln!("{} Recorded in history (id {})", "Note:".cyan(), id);
    }

    Ok(())
}

/// Add the problem to the local history, returning the entry id
pub(crate) fn remember(
    config: &Config,
    project_name: &str,
    problem: &str,
    file: Option<&str>,
) -> Result<i64> {
    let path = config.history_path();
    let mut history = History::load(&path)?;
    let id = history.record(project_name, problem, file);
    history.save(&path)?;
    Ok(id)
}
