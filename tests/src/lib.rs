#![cfg(test)]

use crate::fixtures::server::{FakeBuild, FakeJenkins};
use crate::fixtures::*;
use nodelog::export;
use nodelog::fetch::{BuildSource, JenkinsSource};
use nodelog::jobs::{self, TrackOutcome};
use nodelog::{Storage, StoreError};
use nodelog_common::api::Executor;
use nodelog_common::config::ConfigFile;
use nodelog_common::errors::{FetchError, HostError};
use nodelog_common::{JobFilter, HOST_FAILURE_PREFIX};
use rstest::rstest;
use std::net::TcpListener;


#[rstest]
#[tokio::test]
pub async fn list_jobs_is_filtered(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![]);
    jenkins.add_job("euca-jdk-linux", vec![]);
    jenkins.add_job("euca-jdk-windows", vec![]);
    let client = make_client(&config_file(&jenkins, &workspace));

    let all = client.list_jobs(&JobFilter::All).await.unwrap();
    assert_eq!(all.len(), 3);

    let jobs = client
        .list_jobs(&JobFilter::regex("^euca-.*-linux$").unwrap())
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "euca-jdk-linux");
    assert_eq!(jobs[0].url, format!("{}/job/euca-jdk-linux/", jenkins.url()));
}

#[rstest]
#[tokio::test]
pub async fn list_jobs_reports_unreachable_server(workspace: Workspace) {
    // grab a free port and release it again, nothing listens there afterwards
    let address = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut config = ConfigFile::default();
    config.jenkins.url = Some(format!("http://{}", address));
    config.store.path = Some(workspace.store.clone());

    let client = make_client(&config);
    let err = client.list_jobs(&JobFilter::All).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { .. }));
}

#[rstest]
#[tokio::test]
pub async fn credentials_are_sent_as_basic_auth(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![]);
    jenkins.with(|state| state.auth = Some(data::BASIC_AUTH.to_string()));

    let mut config = config_file(&jenkins, &workspace);
    let anonymous = make_client(&config);
    let err = anonymous.list_jobs(&JobFilter::All).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { .. }));

    config.jenkins.url = Some(format!("http://admin:secret@{}/", jenkins.address));
    let client = make_client(&config);
    let jobs = client.list_jobs(&JobFilter::All).await.unwrap();
    assert_eq!(jobs.len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn encoded_url_credentials_are_decoded(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![]);
    jenkins.with(|state| state.auth = Some(data::ENCODED_BASIC_AUTH.to_string()));

    let mut config = config_file(&jenkins, &workspace);
    config.jenkins.url = Some(format!(
        "http://build%20bot:p%40ss%3Aw0rd@{}/",
        jenkins.address
    ));
    let client = make_client(&config);
    let jobs = client.list_jobs(&JobFilter::All).await.unwrap();
    assert_eq!(jobs.len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn fetch_builds_resolves_hosts(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job(
        "nightly",
        vec![
            FakeBuild::on_host(12, "h3").with_counts(2, 40),
            FakeBuild::on_host(11, "h2").with_console(Some(data::HOST_KEY_CONSOLE)),
            FakeBuild::on_host(10, "h1").with_console(None),
            FakeBuild::on_host(9, "h1").with_console(Some("Started by timer\n")),
            FakeBuild::on_host(8, "h1").running(),
        ],
    );
    let config = config_file(&jenkins, &workspace);
    let client = make_client(&config);
    let job = client.list_jobs(&JobFilter::All).await.unwrap().remove(0);

    let source = JenkinsSource::new(client, 2);
    let builds = source.fetch_builds(&job).await.unwrap();

    let numbers = builds.iter().map(|b| b.number).collect::<Vec<_>>();
    assert_eq!(numbers, vec![12, 11, 10, 9, 8]);

    assert_eq!(builds[0].host, "h3");
    assert_eq!(builds[0].failed, Some(2));
    assert_eq!(builds[0].total, Some(40));
    assert_eq!(
        builds[1].host,
        format!("{}{}", HOST_FAILURE_PREFIX, HostError::HostKeyVerification)
    );
    assert!(builds[2].host.starts_with(HOST_FAILURE_PREFIX));
    assert_eq!(builds[3].host, "failure: No Host");
    assert_eq!(builds[4].result, None);
    assert_eq!(builds[4].failed, None);
}

#[rstest]
#[tokio::test]
pub async fn fetch_builds_of_broken_job_fails(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![FakeBuild::on_host(1, "h1")]);
    jenkins.with(|state| {
        state.broken_jobs.insert("nightly".to_string());
    });
    let client = make_client(&config_file(&jenkins, &workspace));
    let job = client.list_jobs(&JobFilter::All).await.unwrap().remove(0);

    let err = JenkinsSource::new(client, 2)
        .fetch_builds(&job)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { .. }));
}

#[rstest]
#[tokio::test]
pub async fn track_jobs_from_server(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![]);
    jenkins.add_job("release", vec![]);
    let client = make_client(&config_file(&jenkins, &workspace));
    let remote = client.list_jobs(&JobFilter::All).await.unwrap();

    let mut store = workspace.open_store();
    let names = vec!["nightly".to_string(), "missing".to_string()];
    let outcomes = jobs::track_jobs(&mut store, &remote, &names);
    assert_eq!(outcomes[0].1, TrackOutcome::Added);
    assert_eq!(outcomes[1].1, TrackOutcome::NotFound);

    let outcomes = jobs::track_jobs(&mut store, &remote, &names[..1]);
    assert_eq!(outcomes[0].1, TrackOutcome::AlreadyTracked);
    assert_eq!(store.list_jobs().unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn refresh_stores_failed_host_lookup(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job(
        "nightly",
        vec![
            FakeBuild::on_host(11, "h2").with_console(None),
            FakeBuild::on_host(10, "h1"),
        ],
    );
    track(&jenkins, &workspace, &["nightly"]);
    let config = config_file(&jenkins, &workspace);

    let report = make_coordinator(&config).refresh(false).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].number, 11);

    let builds = workspace.open_store().list_builds("nightly").unwrap();
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].number, 10);
    assert_eq!(builds[0].host, "h1");
    assert_eq!(builds[1].number, 11);
    assert!(builds[1].host.starts_with(HOST_FAILURE_PREFIX));
}

#[rstest]
#[tokio::test]
pub async fn refresh_keeps_stored_builds(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![FakeBuild::on_host(10, "h1")]);
    track(&jenkins, &workspace, &["nightly"]);
    let config = config_file(&jenkins, &workspace);
    let coordinator = make_coordinator(&config);
    coordinator.refresh(false).await.unwrap();

    jenkins.add_job(
        "nightly",
        vec![FakeBuild::on_host(12, "h3"), FakeBuild::on_host(10, "h2")],
    );
    let report = coordinator.refresh(false).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.updated, 0);

    let hosts = workspace
        .open_store()
        .list_builds("nightly")
        .unwrap()
        .into_iter()
        .map(|b| (b.number, b.host))
        .collect::<Vec<_>>();
    assert_eq!(
        hosts,
        vec![(10, "h1".to_string()), (12, "h3".to_string())]
    );
}

#[rstest]
#[tokio::test]
pub async fn refresh_with_update_overwrites(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![FakeBuild::on_host(10, "h1").running()]);
    track(&jenkins, &workspace, &["nightly"]);
    let config = config_file(&jenkins, &workspace);
    let coordinator = make_coordinator(&config);
    coordinator.refresh(false).await.unwrap();

    jenkins.add_job("nightly", vec![FakeBuild::on_host(10, "h2").with_counts(0, 12)]);
    let report = coordinator.refresh(true).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 0);

    let builds = workspace.open_store().list_builds("nightly").unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].host, "h2");
    assert_eq!(builds[0].result.as_deref(), Some("SUCCESS"));
    assert_eq!(builds[0].total, Some(12));
}

#[rstest]
#[tokio::test]
pub async fn refresh_twice_is_idempotent(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job(
        "nightly",
        vec![FakeBuild::on_host(2, "h1"), FakeBuild::on_host(1, "h1")],
    );
    jenkins.add_job("release", vec![FakeBuild::on_host(7, "h2")]);
    track(&jenkins, &workspace, &["nightly", "release"]);
    let config = config_file(&jenkins, &workspace);
    let coordinator = make_coordinator(&config);

    let first = coordinator.refresh(false).await.unwrap();
    assert_eq!(first.inserted, 3);
    assert!(first.is_clean());
    let before = workspace.open_store().list_all_builds().unwrap();

    let second = coordinator.refresh(false).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    let after = workspace.open_store().list_all_builds().unwrap();
    assert_eq!(before, after);
}

#[rstest]
#[tokio::test]
pub async fn refresh_skips_broken_job(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("broken", vec![FakeBuild::on_host(1, "h1")]);
    jenkins.add_job("nightly", vec![FakeBuild::on_host(1, "h1")]);
    jenkins.with(|state| {
        state.broken_jobs.insert("broken".to_string());
    });
    track(&jenkins, &workspace, &["broken", "nightly"]);
    let config = config_file(&jenkins, &workspace);

    let report = make_coordinator(&config).refresh(false).await.unwrap();
    assert_eq!(report.jobs, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].job, "broken");

    let mut store = workspace.open_store();
    assert!(store.list_builds("broken").unwrap().is_empty());
    assert_eq!(store.list_builds("nightly").unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn refresh_fails_on_locked_store(jenkins: FakeJenkins, workspace: Workspace) {
    track(&jenkins, &workspace, &[]);
    let config = config_file(&jenkins, &workspace);
    let _lock = nodelog::db::StoreLock::acquire(&workspace.store).unwrap();

    let err = make_coordinator(&config).refresh(false).await.unwrap_err();
    assert!(matches!(err, StoreError::Locked { .. }));
}

#[rstest]
#[tokio::test]
pub async fn export_after_refresh(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("release", vec![FakeBuild::on_host(3, "h1")]);
    jenkins.add_job(
        "nightly",
        vec![FakeBuild::on_host(2, "h2"), FakeBuild::on_host(1, "h1")],
    );
    track(&jenkins, &workspace, &["nightly", "release"]);
    let config = config_file(&jenkins, &workspace);
    make_coordinator(&config).refresh(false).await.unwrap();

    let mut out = Vec::new();
    let rows = export::export_csv(&mut workspace.open_store(), &JobFilter::All, &mut out).unwrap();
    assert_eq!(rows, 3);

    let out = String::from_utf8(out).unwrap();
    let keys = out
        .lines()
        .map(|line| line.split(',').take(3).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec![
            "Job,Number,Host",
            "nightly,1,h1",
            "nightly,2,h2",
            "release,3,h1",
        ]
    );
}

#[rstest]
#[tokio::test]
pub async fn executors_and_node_ip(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.with(|state| {
        state.executors = data::EXECUTORS.to_string();
        state
            .node_logs
            .insert("euca-jdk-1".to_string(), data::NODE_LOG.to_string());
    });
    let client = make_client(&config_file(&jenkins, &workspace));

    let executors = client.list_executors().await.unwrap();
    assert_eq!(
        executors,
        vec![
            Executor {
                node: "dumslav".to_string(),
                build: None,
            },
            Executor {
                node: "euca-jdk-1".to_string(),
                build: Some("nightly #10".to_string()),
            },
        ]
    );

    let ip = client.fetch_node_ip("euca-jdk-1").await.unwrap();
    assert_eq!(ip, "10.0.0.2");

    let err = client.fetch_node_ip("dumslav").await.unwrap_err();
    assert!(matches!(err, HostError::Fetch(FetchError::Status { .. })));
}

#[rstest]
#[tokio::test]
pub async fn job_config_fields(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("euca-jdk-linux", vec![]);
    jenkins.add_job("euca-jdk-windows", vec![]);
    jenkins.add_job("nightly", vec![]);
    jenkins.with(|state| {
        state
            .configs
            .insert("euca-jdk-linux".to_string(), data::JOB_CONFIG.to_string());
    });
    let client = make_client(&config_file(&jenkins, &workspace));

    let jobs = client
        .list_jobs(&JobFilter::Prefix("euca-".to_string()))
        .await
        .unwrap();
    assert_eq!(jobs.len(), 2);

    let config = client.fetch_job_config("euca-jdk-linux").await.unwrap();
    assert_eq!(
        config.get("assignedNode").map(String::as_str),
        Some("10.0_websphere-6.1_oracle-11.2_jdk-1.5_linux-2.6")
    );
    assert_eq!(config.get("scm").map(String::as_str), Some(""));
    assert!(config["builders"].contains("<command>make check</command>"));
    assert!(!config.contains_key("command"));

    let err = client.fetch_job_config("euca-jdk-windows").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { .. }));
}

#[rstest]
#[tokio::test]
pub async fn job_config_rejects_broken_xml(jenkins: FakeJenkins, workspace: Workspace) {
    jenkins.add_job("nightly", vec![]);
    jenkins.with(|state| {
        state.configs.insert(
            "nightly".to_string(),
            "<project><assignedNode>linux".to_string(),
        );
    });
    let client = make_client(&config_file(&jenkins, &workspace));

    let err = client.fetch_job_config("nightly").await.unwrap_err();
    assert!(matches!(err, FetchError::Xml { .. }));
}
