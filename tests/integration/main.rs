//! Integration tests for Codeviewer
//!
//! A real server on an ephemeral port, driven over HTTP.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codeviewer_analyzer::{dot_available, GoAnalyzerFactory};
use codeviewer_core::{
    sanitize, unquote_struct, Analyzer, AnalyzerFactory, ArtifactLayout, DrawRequest, DrawResponse, DrawStatus,
    IndexPolicy, Materializer, ProjectRegistry, Relation, RelationIndex, Snippets,
};
use codeviewer_server::{CodeviewerServer, ServerConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Analyzer that counts drawing calls and sleeps inside them.
struct SlowAnalyzer {
    output_dir: PathBuf,
    draws: AtomicUsize,
}

impl SlowAnalyzer {
    async fn write(&self, prefix: &str, name: &str) -> anyhow::Result<()> {
        self.draws.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let stem = format!("{}_{}", prefix, sanitize(unquote_struct(name)));
        tokio::fs::write(self.output_dir.join(format!("{}.png", stem)), b"png").await?;
        tokio::fs::write(self.output_dir.join(format!("{}.txt", stem)), format!("{} of {}", prefix, name)).await?;
        Ok(())
    }
}

fn snippet(label: &str, text: String) -> Snippets {
    let mut snippets = Snippets::new();
    snippets.insert(label.to_string(), text);
    snippets
}

#[async_trait::async_trait]
impl Analyzer for SlowAnalyzer {
    fn relation(&self) -> Relation {
        let mut structs = BTreeMap::new();
        structs.insert("-".to_string(), vec!["pkg/DoWork".to_string()]);
        structs.insert("User".to_string(), vec!["pkg/User.Save".to_string()]);
        let mut relation = Relation::new();
        relation.insert("pkg".to_string(), structs);
        relation
    }

    async fn draw_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.write("function", name).await
    }

    async fn draw_callee_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.write("function_callee", name).await
    }

    async fn draw_caller_function(&self, name: &str, _depth: usize) -> anyhow::Result<()> {
        self.write("function_caller", name).await
    }

    async fn draw_struct(&self, quoted_name: &str, _depth: usize) -> anyhow::Result<()> {
        self.write("struct", quoted_name).await
    }

    fn function_callee_snippets(&self, name: &str) -> Snippets {
        snippet("pkg/work.go:3-9", format!("callee of {}", name))
    }

    fn function_caller_snippets(&self, name: &str) -> Snippets {
        snippet("cmd/main.go:5-8", format!("caller of {}", name))
    }

    fn struct_snippets(&self, quoted_name: &str) -> Snippets {
        snippet("pkg/user.go:1-4", format!("type {} struct", quoted_name))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[derive(Default)]
struct SlowFactory {
    created: std::sync::Mutex<Vec<Arc<SlowAnalyzer>>>,
}

impl SlowFactory {
    fn draws(&self) -> usize {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.draws.load(Ordering::SeqCst))
            .sum()
    }
}

impl AnalyzerFactory for SlowFactory {
    fn create(&self, _project_path: &Path, output_dir: &Path) -> anyhow::Result<Arc<dyn Analyzer>> {
        let analyzer = Arc::new(SlowAnalyzer {
            output_dir: output_dir.to_path_buf(),
            draws: AtomicUsize::new(0),
        });
        self.created.lock().unwrap().push(Arc::clone(&analyzer));
        Ok(analyzer)
    }
}

struct TestServer {
    base: String,
    resource: PathBuf,
    registry: Arc<ProjectRegistry>,
    _temp: TempDir,
}

/// Start a server for `project_list` and return its base URL.
async fn start_server(project_list: &str, factory: &dyn AnalyzerFactory) -> TestServer {
    let temp = TempDir::new().unwrap();
    let resource = temp.path().join("resource");
    let layout = ArtifactLayout::new(&resource);
    let registry = Arc::new(ProjectRegistry::from_list(project_list, &layout, factory));
    let index = Arc::new(RelationIndex::build(Arc::clone(&registry), IndexPolicy::Startup));
    let materializer = Arc::new(Materializer::new(Arc::clone(&registry), layout));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = CodeviewerServer::new(materializer, index, ServerConfig::default());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    TestServer {
        base: format!("http://{}", addr),
        resource,
        registry,
        _temp: temp,
    }
}

async fn post_draw(client: &reqwest::Client, base: &str, request: &DrawRequest) -> DrawResponse {
    let response = client
        .post(format!("{}/draw/", base))
        .json(request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_function_draw_then_cache_hit() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n", &factory).await;
    let client = reqwest::Client::new();
    let request = DrawRequest::function("svc", "pkg/DoWork");

    let first = post_draw(&client, &server.base, &request).await;
    assert_eq!(first.status, DrawStatus::Success);
    assert_eq!(first.display_text, "function_caller of pkg/DoWork");
    assert_eq!(first.callee_code_snippet["pkg/work.go:3-9"], "callee of pkg/DoWork");
    assert_eq!(first.caller_code_snippet["cmd/main.go:5-8"], "caller of pkg/DoWork");
    assert!(first.struct_code_snippet.is_empty());

    let dir = server.resource.join("svc");
    for file in [
        "function_callee_pkg_DoWork.png",
        "function_callee_pkg_DoWork.txt",
        "function_caller_pkg_DoWork.png",
        "function_caller_pkg_DoWork.txt",
    ] {
        assert!(dir.join(file).is_file(), "{} missing", file);
    }
    assert_eq!(factory.draws(), 2);

    let second = post_draw(&client, &server.base, &request).await;
    assert_eq!(second, first);
    assert_eq!(factory.draws(), 2);
}

#[tokio::test]
async fn test_unknown_project_is_soft_failure() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n", &factory).await;
    let client = reqwest::Client::new();

    let response = post_draw(&client, &server.base, &DrawRequest::function("ghost", "main")).await;
    assert_eq!(response, DrawResponse::fail());
    assert!(!server.resource.join("ghost").exists());
    assert_eq!(factory.draws(), 0);
}

#[tokio::test]
async fn test_struct_draw() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n", &factory).await;
    let client = reqwest::Client::new();

    let response = post_draw(&client, &server.base, &DrawRequest::structure("svc", "User")).await;
    assert!(response.is_success());
    assert_eq!(response.display_text, "struct of \"User\"");
    assert_eq!(response.struct_code_snippet["pkg/user.go:1-4"], "type \"User\" struct");
    assert!(response.callee_code_snippet.is_empty());
    assert!(server.resource.join("svc").join("struct_User.png").is_file());
    assert!(server.resource.join("svc").join("struct_User.txt").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_requests_draw_once() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n", &factory).await;
    let client = reqwest::Client::new();
    let request = DrawRequest::function("svc", "pkg/Race");

    let responses =
        futures_util::future::join_all((0..8).map(|_| post_draw(&client, &server.base, &request))).await;

    assert!(responses.iter().all(|r| r.is_success()));
    // one callee and one caller diagram
    assert_eq!(factory.draws(), 2);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n", &factory).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/draw/", server.base))
        .header("content-type", "application/json")
        .body("{\"project\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: DrawResponse = response.json().await.unwrap();
    assert_eq!(body, DrawResponse::fail());
    assert_eq!(factory.draws(), 0);
}

#[tokio::test]
async fn test_load_and_health() {
    let factory = SlowFactory::default();
    let server = start_server("/src/svc\n/src/web\n", &factory).await;
    let client = reqwest::Client::new();

    let relations: serde_json::Value = client
        .get(format!("{}/load/", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let expected: BTreeMap<String, Relation> = server
        .registry
        .iter()
        .map(|p| (p.id.to_string(), p.analyzer.relation()))
        .collect();
    assert_eq!(relations, serde_json::to_value(&expected).unwrap());
    assert_eq!(relations["web"]["pkg"]["User"][0], "pkg/User.Save");

    let health: serde_json::Value = client
        .get(format!("{}/health/", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["projects"], 2);
}

const GO_MAIN: &str = r#"package main

func main() {
	serve()
}

func serve() {
	listen()
}

func listen() {}
"#;

/// Full stack with the Go analyzer; needs Graphviz.
#[tokio::test]
async fn test_go_project_end_to_end() {
    if !dot_available() {
        eprintln!("graphviz 'dot' not available; skipping");
        return;
    }
    let project = TempDir::new().unwrap();
    let root = project.path().join("hello");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("main.go"), GO_MAIN).unwrap();

    let server = start_server(&format!("{}\n", root.display()), &GoAnalyzerFactory).await;
    let client = reqwest::Client::new();

    let response = post_draw(&client, &server.base, &DrawRequest::function("hello", "main/serve")).await;
    assert!(response.is_success());
    assert!(response.display_text.contains("main/main -> main/serve"));
    assert_eq!(response.callee_code_snippet.len(), 2);
    assert!(response.caller_code_snippet.contains_key("main.go:3-5 main/main"));
    assert!(server.resource.join("hello").join("function_callee_main_serve.png").is_file());
}

/// The binary prints its version and the relation index.
#[test]
fn test_cli_commands() {
    let bin = env!("CARGO_BIN_EXE_codeviewer");

    let output = Command::new(bin).arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Codeviewer v"));

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("hello");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("main.go"), GO_MAIN).unwrap();
    let list = temp.path().join("projects.txt");
    std::fs::write(&list, format!("{}\n", root.display())).unwrap();

    let output = Command::new(bin)
        .arg("relations")
        .arg("--projects")
        .arg(&list)
        .arg("--resource-dir")
        .arg(temp.path().join("resource"))
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let relations: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        relations["hello"]["main"]["-"],
        serde_json::json!(["main/main", "main/serve", "main/listen"])
    );
}
