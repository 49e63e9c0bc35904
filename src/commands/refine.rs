use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use contextforge::config::{Config, MEMORY_FETCH_LIMIT};
use contextforge::context::ContextRegistry;
use contextforge::error::{ForgeError, Result};
use contextforge::feedback::{record_outcome, Outcome};
use contextforge::refine::client::GatewayClient;
use contextforge::refine::{RefinementKind, RefinementPayload};
use contextforge::renderer::prompt;
use contextforge::store::{self, RefinementRecord};

#[allow(clippy::too_many_arguments)]
pub fn cmd_refine(
    config: &Config,
    project: &str,
    problem: &str,
    kind: RefinementKind,
    file: Option<&str>,
    gateway_url: Option<&str>,
    no_feedback: bool,
    no_history: bool,
) -> Result<()> {
    let registry = ContextRegistry::load(&config.contexts_dir)?;
    let context = registry.get(project)?;
    let problem = prompt::validate_problem(problem)?;
    let original = prompt::compose(problem, file, context);

    if !no_history {
        super::compose::remember(config, &context.name, problem, file)?;
    }

    let gateway = GatewayClient::new(gateway_url.unwrap_or(&config.server.gateway_url));
    let store = store::open(config);

    let rt = super::runtime()?;
    rt.block_on(async {
        let memory = match store.top_solutions(&context.id, MEMORY_FETCH_LIMIT).await {
            Ok(memory) => memory,
            Err(e) => {
                tracing::warn!(error = %e, project = %context.id, "could not load prior solutions");
                Vec::new()
            }
        };
        tracing::debug!(entries = memory.len(), "loaded prior solutions");

        let payload = RefinementPayload {
            project_id: context.id.clone(),
            original_prompt: original.clone(),
            project_context: context.project_context.clone().unwrap_or_default(),
            kind,
            problem: problem.to_string(),
            memory,
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner());
        spinner.set_message(format!("Refining ({}: {})...", kind, kind.description()));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = gateway.refine(&payload).await;
        spinner.finish_and_clear();
        let response = result?;

        println!("{}", response.prompt_refinado);
        eprintln!();
        eprintln!(
            "{} {} tokens ({} in, {} out) via {}",
            "Refined".green().bold(),
            response.tokens,
            response.input_tokens,
            response.output_tokens,
            gateway.url().dimmed()
        );

        let record = RefinementRecord {
            id: None,
            project_id: context.id.clone(),
            problem: problem.to_string(),
            original_prompt: original,
            refined_prompt: response.prompt_refinado.clone(),
            kind: kind.to_string(),
            tokens_used: response.tokens,
            resolved: None,
        };
        let refinement_id = match store.insert_refinement(&record).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, project = %context.id, "could not save refinement");
                None
            }
        };
        if let Some(id) = &refinement_id {
            eprintln!("{} {}", "Saved refinement".dimmed(), id);
        }

        if no_feedback || !std::io::stdin().is_terminal() {
            return Ok(());
        }

        let worked = Confirm::new()
            .with_prompt("Did the refined prompt solve the problem?")
            .default(true)
            .interact()
            .map_err(|e| ForgeError::Config(format!("Input cancelled: {}", e)))?;

        record_outcome(
            store.as_ref(),
            &Outcome {
                project_id: context.id.clone(),
                problem: problem.to_string(),
                prompt: response.prompt_refinado.clone(),
                kind,
                refinement_id,
                worked,
            },
        )
        .await?;

        if worked {
            println!("{} Saved to the project's solution memory.", "Done!".green().bold());
        }
        Ok(())
    })
}
