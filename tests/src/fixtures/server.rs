use actix_web::dev::{Server, ServerHandle};
use actix_web::http::header;
use actix_web::web::{self, Data};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use nodelog_common::errors::*;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

pub const DUMMY_TIMESTAMP: i64 = 1_400_000_000_000;

#[derive(Debug, Clone)]
pub struct FakeBuild {
    pub number: i32,
    pub duration: i64,
    pub timestamp: i64,
    pub result: Option<String>,
    /// `None` makes the console endpoint fail
    pub console: Option<String>,
    pub counts: Option<(i32, i32)>,
}

impl FakeBuild {
    pub fn on_host(number: i32, host: &str) -> FakeBuild {
        FakeBuild {
            number,
            duration: 61_000,
            timestamp: DUMMY_TIMESTAMP + i64::from(number) * 1000,
            result: Some("SUCCESS".to_string()),
            console: Some(format!(
                "Started by timer\nBuilding remotely\nNode Controller: {} : connected\nFinished: SUCCESS\n",
                host
            )),
            counts: None,
        }
    }

    pub fn with_console(mut self, console: Option<&str>) -> FakeBuild {
        self.console = console.map(String::from);
        self
    }

    pub fn with_counts(mut self, failed: i32, total: i32) -> FakeBuild {
        self.counts = Some((failed, total));
        self
    }

    pub fn running(mut self) -> FakeBuild {
        self.result = None;
        self
    }
}

#[derive(Debug, Default)]
pub struct JenkinsState {
    pub base: String,
    pub jobs: BTreeMap<String, Vec<FakeBuild>>,
    /// Jobs whose build list returns a server error
    pub broken_jobs: HashSet<String>,
    pub executors: String,
    pub node_logs: HashMap<String, String>,
    /// `config.xml` per job name
    pub configs: HashMap<String, String>,
    /// Expected `Authorization` header, if any
    pub auth: Option<String>,
}

type State = Data<Arc<RwLock<JenkinsState>>>;

fn authorized(req: &HttpRequest, state: &JenkinsState) -> bool {
    let Some(expected) = &state.auth else {
        return true;
    };
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

async fn list_jobs(req: HttpRequest, state: State) -> HttpResponse {
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }

    let jobs = state
        .jobs
        .keys()
        .map(|name| {
            json!({
                "_class": "hudson.model.FreeStyleProject",
                "name": name,
                "url": format!("{}/job/{}/", state.base, name),
            })
        })
        .collect::<Vec<_>>();
    HttpResponse::Ok().json(json!({
        "_class": "hudson.model.Hudson",
        "jobs": jobs,
    }))
}

async fn job_builds(req: HttpRequest, path: web::Path<String>, state: State) -> HttpResponse {
    let name = path.into_inner();
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }
    if state.broken_jobs.contains(&name) {
        return HttpResponse::InternalServerError().finish();
    }
    let Some(builds) = state.jobs.get(&name) else {
        return HttpResponse::NotFound().finish();
    };

    let builds = builds
        .iter()
        .map(|build| {
            let mut actions = vec![json!({"_class": "hudson.model.CauseAction"}), json!(null)];
            if let Some((failed, total)) = build.counts {
                actions.push(json!({
                    "_class": "hudson.tasks.junit.TestResultAction",
                    "failCount": failed,
                    "totalCount": total,
                }));
            }
            json!({
                "_class": "hudson.model.FreeStyleBuild",
                "number": build.number,
                "url": format!("{}/job/{}/{}/", state.base, name, build.number),
                "duration": build.duration,
                "timestamp": build.timestamp,
                "result": build.result,
                "actions": actions,
            })
        })
        .collect::<Vec<_>>();
    HttpResponse::Ok().json(json!({
        "_class": "hudson.model.FreeStyleProject",
        "builds": builds,
    }))
}

async fn console_text(
    req: HttpRequest,
    path: web::Path<(String, i32)>,
    state: State,
) -> HttpResponse {
    let (name, number) = path.into_inner();
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }

    let console = state
        .jobs
        .get(&name)
        .and_then(|builds| builds.iter().find(|b| b.number == number))
        .and_then(|build| build.console.clone());
    match console {
        Some(console) => HttpResponse::Ok().content_type("text/plain").body(console),
        None => HttpResponse::InternalServerError().finish(),
    }
}

async fn job_config(req: HttpRequest, path: web::Path<String>, state: State) -> HttpResponse {
    let name = path.into_inner();
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }
    match state.configs.get(&name) {
        Some(xml) => HttpResponse::Ok()
            .content_type("application/xml")
            .body(xml.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn executors(req: HttpRequest, state: State) -> HttpResponse {
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok()
        .content_type("text/html")
        .body(state.executors.clone())
}

async fn node_log(req: HttpRequest, path: web::Path<String>, state: State) -> HttpResponse {
    let node = path.into_inner();
    let state = state.read().unwrap();
    if !authorized(&req, &state) {
        return HttpResponse::Unauthorized().finish();
    }
    match state.node_logs.get(&node) {
        Some(log) => HttpResponse::Ok().content_type("text/html").body(log.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

/// Serves the subset of the jenkins http surface nodelog reads from.
pub struct FakeJenkins {
    pub state: Arc<RwLock<JenkinsState>>,
    pub address: SocketAddr,
    server_handle: ServerHandle,
}

impl FakeJenkins {
    pub fn start() -> Result<FakeJenkins> {
        let state = Arc::new(RwLock::new(JenkinsState::default()));

        let data = Data::new(state.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/api/json", web::get().to(list_jobs))
                .route("/job/{name}/api/json", web::get().to(job_builds))
                .route("/job/{name}/config.xml", web::get().to(job_config))
                .route("/job/{name}/{number}/consoleText", web::get().to(console_text))
                .route("/ajaxExecutors", web::get().to(executors))
                .route(
                    "/computer/{node}/logText/progressiveHtml",
                    web::get().to(node_log),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let address = *server
            .addrs()
            .first()
            .context("Fake jenkins didn't bind to any address")?;
        let server: Server = server.run();
        let server_handle = server.handle();
        tokio::spawn(server);

        state.write().unwrap().base = format!("http://{}", address);

        for _ in 0..100 {
            if TcpStream::connect(address).is_ok() {
                return Ok(FakeJenkins {
                    state,
                    address,
                    server_handle,
                });
            }
            thread::sleep(Duration::from_millis(100));
        }

        bail!("Failed to wait for fake jenkins to start");
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn with<F: FnOnce(&mut JenkinsState)>(&self, f: F) {
        f(&mut self.state.write().unwrap());
    }

    pub fn add_job(&self, name: &str, builds: Vec<FakeBuild>) {
        self.with(|state| {
            state.jobs.insert(name.to_string(), builds);
        });
    }
}

impl Drop for FakeJenkins {
    fn drop(&mut self) {
        #[allow(clippy::let_underscore_future)]
        let _ = self.server_handle.stop(false);
    }
}
