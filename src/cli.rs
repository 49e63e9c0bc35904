use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::refine::RefinementKind;

#[derive(Parser)]
#[command(
    name = "contextforge",
    about = "Compose context-rich prompts for your projects and refine them with an LLM",
    version
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(global = true, long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the refinement gateway (POST /api/refinar-prompt)
    Serve {
        /// Address to bind, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
    },

    /// List known project contexts
    Projects,

    /// Compose a prompt document for a problem in a project
    Compose {
        /// Project id (file stem under the contexts directory)
        project: String,

        /// Problem description (at least 20 characters)
        problem: String,

        /// Main file involved in the problem
        #[arg(long)]
        file: Option<String>,

        /// Also write the prompt to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Don't record the problem in the local history
        #[arg(long)]
        no_history: bool,
    },

    /// Compose a prompt and send it to the gateway for refinement
    Refine {
        /// Project id
        project: String,

        /// Problem description (at least 20 characters)
        problem: String,

        /// Refinement strategy: especifico, contexto, alternativa, correcao, refinar
        #[arg(long, short, default_value = "especifico", value_parser = parse_kind)]
        kind: RefinementKind,

        /// Main file involved in the problem
        #[arg(long)]
        file: Option<String>,

        /// Gateway base URL (defaults to CONTEXTFORGE_GATEWAY_URL)
        #[arg(long)]
        gateway: Option<String>,

        /// Don't ask whether the refined prompt worked
        #[arg(long)]
        no_feedback: bool,

        /// Don't record the problem in the local history
        #[arg(long)]
        no_history: bool,
    },

    /// Record whether a prompt solved the problem
    Feedback {
        /// Project id
        project: String,

        /// Problem the prompt was for
        problem: String,

        /// Did it work?
        #[arg(value_enum)]
        outcome: Verdict,

        /// Strategy used for the refinement
        #[arg(long, short, default_value = "especifico", value_parser = parse_kind)]
        kind: RefinementKind,

        /// The prompt that was tried (defaults to the composed prompt)
        #[arg(long)]
        prompt: Option<String>,

        /// Stored refinement to mark resolved or unresolved
        #[arg(long)]
        refinement_id: Option<String>,
    },

    /// Local problem history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Manage stored credentials (Anthropic, Supabase)
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// Show recent problems, newest first
    List {
        /// Maximum entries to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },

    /// Mark a problem as resolved
    Resolve {
        /// Entry id as shown by `history list`
        id: i64,

        /// Minutes it took to resolve
        #[arg(long)]
        minutes: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Store credentials for a service
    Login {
        /// Service name (anthropic, supabase); prompts when omitted
        service: Option<String>,
    },

    /// Show where each credential comes from
    Status,

    /// Remove stored credentials for a service
    Logout {
        /// Service name (anthropic, supabase)
        service: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verdict {
    Worked,
    Failed,
}

impl Verdict {
    pub fn worked(self) -> bool {
        matches!(self, Verdict::Worked)
    }
}

fn parse_kind(raw: &str) -> std::result::Result<RefinementKind, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn refine_kind_defaults_and_rejects_unknown() {
        let cli = Cli::try_parse_from([
            "contextforge",
            "refine",
            "toolbox",
            "Button does nothing on click",
        ])
        .unwrap();
        match cli.command {
            Commands::Refine { kind, .. } => assert_eq!(kind, RefinementKind::Especifico),
            _ => panic!("expected refine"),
        }

        let err = Cli::try_parse_from([
            "contextforge",
            "refine",
            "toolbox",
            "Button does nothing on click",
            "--kind",
            "invalid",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn feedback_parses_verdict() {
        let cli = Cli::try_parse_from([
            "contextforge",
            "feedback",
            "toolbox",
            "Button does nothing on click",
            "failed",
            "--refinement-id",
            "42",
        ])
        .unwrap();
        match cli.command {
            Commands::Feedback {
                outcome,
                refinement_id,
                ..
            } => {
                assert!(!outcome.worked());
                assert_eq!(refinement_id.as_deref(), Some("42"));
            }
            _ => panic!("expected feedback"),
        }
    }
}
