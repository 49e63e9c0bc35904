use colored::Colorize;

use contextforge::config::Config;
use contextforge::error::Result;
use contextforge::history::History;

pub fn cmd_history_list(config: &Config, limit: usize) -> Result<()> {
    let history = History::load(&config.history_path())?;

    if history.is_empty() {
        println!("{} No problems recorded yet.", "Note:".cyan());
        return Ok(());
    }

    println!("{}", "Problem History".green().bold());
    println!("{}", "=".repeat(60));

    for entry in history.entries().iter().take(limit) {
        let status = match (entry.resolvido, entry.tempo_resolucao) {
            (true, Some(minutes)) => format!("resolved in {} min", minutes).green(),
            (true, None) => "resolved".green(),
            (false, _) => "open".yellow(),
        };
        println!(
            "  {}  {}  [{}]  {}",
            entry.id.to_string().dimmed(),
            entry.criado_em.format("%Y-%m-%d %H:%M"),
            entry.projeto.cyan(),
            status
        );
        println!("      {}", entry.problema);
        if let Some(ref file) = entry.arquivo {
            println!("      {} {}", "file:".dimmed(), file);
        }
    }

    if history.len() > limit {
        println!("  ... {} older entries", history.len() - limit);
    }

    Ok(())
}

pub fn cmd_history_resolve(config: &Config, id: i64, minutes: Option<u32>) -> Result<()> {
    let path = config.history_path();
    let mut history = History::load(&path)?;
    let problem = history.mark_resolved(id, minutes)?.problema.clone();
    history.save(&path)?;

    println!("{} Marked resolved: {}", "Done!".green().bold(), problem);
    Ok(())
}
