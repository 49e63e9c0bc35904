/// CLI smoke tests: invoke the compiled binary against temp directories.
/// Nothing here talks to a real LLM or datastore.
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROBLEM: &str = "Button does nothing on click";

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("contexts")).unwrap();
        std::fs::write(
            root.path().join("contexts").join("toolbox.json"),
            r#"{
                "nome": "Toolbox",
                "descricao": "Internal admin tools",
                "stack": "Node 20, Express",
                "project_context": "Admin panel for the support team",
                "arquivos_principais": ["src/server.js"],
                "padroes": ["Use async/await"]
            }"#,
        )
        .unwrap();
        Self { root }
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.root.path().join("data")
    }

    fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("contextforge").unwrap();
        cmd.current_dir(self.root.path())
            .env("HOME", self.root.path())
            .env("XDG_CONFIG_HOME", self.root.path().join("config"))
            .env("CONTEXTFORGE_HOME", self.data_dir())
            .env("CONTEXTFORGE_CONTEXTS", self.root.path().join("contexts"))
            .env("RUST_LOG", "warn")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("SUPABASE_URL")
            .env_remove("SUPABASE_SERVICE_ROLE_KEY")
            .env_remove("CONTEXTFORGE_GATEWAY_URL");
        cmd
    }
}

// ── Binary runs ──────────────────────────────────────────────────────────

#[test]
fn help_flag_exits_zero() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refine"));
}

#[test]
fn version_flag_exits_zero() {
    Sandbox::new().cmd().arg("--version").assert().success();
}

#[test]
fn auth_status_without_credentials_exits_zero() {
    Sandbox::new()
        .cmd()
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"));
}

// ── Projects and compose ─────────────────────────────────────────────────

#[test]
fn projects_lists_context_files() {
    Sandbox::new()
        .cmd()
        .arg("projects")
        .assert()
        .success()
        .stdout(predicate::str::contains("toolbox"))
        .stdout(predicate::str::contains("Toolbox (Node 20, Express)"));
}

#[test]
fn compose_prints_prompt_and_records_history() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["compose", "toolbox", PROBLEM, "--file", "src/server.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# TOOLBOX - RESOLVE PROBLEM"))
        .stdout(predicate::str::contains("**Main File:** src/server.js"))
        .stdout(predicate::str::contains("- Use async/await"))
        .stdout(predicate::str::contains("(Architecture not filled in)"));

    sandbox
        .cmd()
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(PROBLEM))
        .stdout(predicate::str::contains("open"));
}

#[test]
fn compose_no_history_leaves_history_empty() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["compose", "toolbox", PROBLEM, "--no-history"])
        .assert()
        .success();

    assert!(!sandbox.data_dir().join("contextforge_history.json").exists());
}

#[test]
fn compose_writes_output_file() {
    let sandbox = Sandbox::new();
    let out = sandbox.root.path().join("prompt.md");
    sandbox
        .cmd()
        .args(["compose", "toolbox", PROBLEM, "--output"])
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(out).unwrap();
    assert!(written.starts_with("# TOOLBOX - RESOLVE PROBLEM"));
}

// ── Graceful errors ──────────────────────────────────────────────────────

#[test]
fn short_problem_is_rejected() {
    Sandbox::new()
        .cmd()
        .args(["compose", "toolbox", "too short"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 20"));
}

#[test]
fn unknown_project_is_rejected() {
    Sandbox::new()
        .cmd()
        .args(["compose", "nope", PROBLEM])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn unknown_refinement_kind_is_rejected() {
    Sandbox::new()
        .cmd()
        .args(["refine", "toolbox", PROBLEM, "--kind", "invalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("especifico"));
}

#[test]
fn resolving_unknown_history_entry_fails() {
    Sandbox::new()
        .cmd()
        .args(["history", "resolve", "12345"])
        .assert()
        .failure();
}

// ── History and feedback round trips ─────────────────────────────────────

#[test]
fn history_resolve_marks_entry() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["compose", "toolbox", PROBLEM])
        .assert()
        .success();

    let raw = std::fs::read_to_string(sandbox.data_dir().join("contextforge_history.json")).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let id = entries[0]["id"].as_i64().unwrap();

    sandbox
        .cmd()
        .args(["history", "resolve", &id.to_string(), "--minutes", "12"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved in 12 min"));
}

#[test]
fn feedback_worked_saves_solution_locally() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["feedback", "toolbox", PROBLEM, "worked", "--prompt", "the prompt that worked"])
        .assert()
        .success();

    let rows =
        std::fs::read_to_string(sandbox.data_dir().join("store").join("solucoes_efetivas.jsonl"))
            .unwrap();
    assert_eq!(rows.lines().count(), 1);
    assert!(rows.contains("\"projeto_id\":\"toolbox\""));
    assert!(rows.contains("\"contexto\":\"the prompt that worked\""));
    assert!(rows.contains("\"vezes_usado\":1"));
}

// ── Refine against a stand-in gateway ────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn refine_prints_gateway_result() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/refinar-prompt"))
        .and(body_partial_json(serde_json::json!({
            "projeto_id": "toolbox",
            "tipo": "contexto",
            "problema": PROBLEM,
            "contexto": "Admin panel for the support team",
            "memoria": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptRefinado": "Refined prompt with more context",
            "tokens": 321,
            "inputTokens": 300,
            "outputTokens": 21,
            "tipo": "contexto",
            "timestamp": "2026-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    let sandbox = Sandbox::new();
    let mut cmd = sandbox.cmd();
    cmd.args(["refine", "toolbox", PROBLEM, "--kind", "contexto", "--no-feedback"])
        .args(["--gateway", &gateway.uri()]);

    let output = tokio::task::spawn_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Refined prompt with more context"))
            .stderr(predicate::str::contains("321 tokens"))
            .get_output()
            .clone()
    })
    .await
    .unwrap();

    // The refinement row is saved locally so feedback can mark it resolved
    let rows =
        std::fs::read_to_string(sandbox.data_dir().join("store").join("refinamentos.jsonl"))
            .unwrap();
    assert_eq!(rows.lines().count(), 1);
    let row: serde_json::Value = serde_json::from_str(rows.lines().next().unwrap()).unwrap();
    assert_eq!(row["projeto_id"], "toolbox");
    assert_eq!(row["prompt_refinado"], "Refined prompt with more context");
    assert_eq!(row["tokens_usados"], 321);

    let id = row["id"].as_str().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(id), "id {} not printed in {}", id, stderr);

    sandbox
        .cmd()
        .args(["feedback", "toolbox", PROBLEM, "failed", "--refinement-id", id])
        .assert()
        .success();
    let rows =
        std::fs::read_to_string(sandbox.data_dir().join("store").join("refinamentos.jsonl"))
            .unwrap();
    assert!(rows.contains("\"resolvido\":false"));
}
