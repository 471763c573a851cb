use std::path::PathBuf;

use a0_engine::client::{DockerClient, ProbeError};
use a0_engine::engine::EngineError;
use a0_engine::executor::{DockerExecutor, StdinWriter};
use a0_engine::runner::{ContainerGuard, ContainerRunner, ContainerState, RunError, RunSpec};
use mockall::mock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mock! {
    Executor {}

    impl DockerExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, EngineError>;
        async fn exec_streaming(&self, args: &[String]) -> Result<(), EngineError>;
        async fn exec_with_stdin(
            &self,
            args: &[String],
            stdin: StdinWriter,
        ) -> Result<(), EngineError>;
        fn follow_output(&self, args: &[String]) -> Result<mpsc::Receiver<String>, EngineError>;
        fn exec_blocking(&self, args: &[String]) -> Result<String, EngineError>;
    }
}

fn spec(ports: &[&str], detach: bool) -> RunSpec {
    RunSpec {
        app_name: "myapp".to_owned(),
        working_dir: PathBuf::from("."),
        tag: "v1".to_owned(),
        ports: ports.iter().map(|p| (*p).to_owned()).collect(),
        env: vec!["MODE=dev".to_owned()],
        detach,
        auto_remove: false,
    }
}

fn command_is(args: &[String], name: &str) -> bool {
    args.first().is_some_and(|a| a == name)
}

fn ok(out: &str) -> Result<String, EngineError> {
    Ok(out.to_owned())
}

/// Probe, image inspect, and an empty `ps` all succeed.
fn expect_preconditions(mock: &mut MockExecutor) {
    mock.expect_exec()
        .withf(|args| command_is(args, "version"))
        .returning(|_| ok("27.1.1\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "image"))
        .returning(|_| ok("sha256:abc\n"));
}

fn expect_no_existing_container(mock: &mut MockExecutor) {
    mock.expect_exec()
        .withf(|args| command_is(args, "ps"))
        .times(1)
        .returning(|_| ok(""));
}

fn expect_create_and_start(mock: &mut MockExecutor) {
    mock.expect_exec()
        .withf(|args| {
            let joined = args.join(" ");
            command_is(args, "create")
                && joined.contains("--name myapp")
                && joined.contains("--publish 8080:80")
                && joined.contains("--env MODE=dev")
                && args.last().is_some_and(|a| a == "myapp:v1")
        })
        .times(1)
        .returning(|_| ok("c0ffee\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "start") && args[1] == "c0ffee")
        .times(1)
        .returning(|_| ok("c0ffee\n"));
}

fn expect_async_cleanup(mock: &mut MockExecutor) {
    mock.expect_exec()
        .withf(|args| command_is(args, "stop") && args.last().is_some_and(|a| a == "c0ffee"))
        .times(1)
        .returning(|_| ok("c0ffee\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "rm") && args.last().is_some_and(|a| a == "c0ffee"))
        .times(1)
        .returning(|_| ok("c0ffee\n"));
}

fn log_lines(lines: &[&str]) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(lines.len().max(1));
    for line in lines {
        tx.try_send((*line).to_owned()).unwrap();
    }
    rx
}

// ── Validation Tests ──

#[tokio::test]
async fn malformed_port_fails_before_any_engine_call() {
    // No expectations: any engine call panics.
    let mock = MockExecutor::new();
    let runner = ContainerRunner::new(DockerClient::with_executor(mock));

    let err = runner
        .run(&spec(&["8080:80", "8080"], false), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::InvalidPortMapping(e) => assert_eq!(e.entry, "8080"),
        other => panic!("expected InvalidPortMapping, got {other:?}"),
    }
}

#[tokio::test]
async fn probe_failure_is_reported_unchanged() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| {
        Err(EngineError::NotFound {
            program: "docker".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    });
    let runner = ContainerRunner::new(DockerClient::with_executor(mock));

    let err = runner
        .run(&spec(&[], false), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Probe(ProbeError::EngineNotInstalled)));
}

#[tokio::test]
async fn missing_image_asks_for_a_build() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| command_is(args, "version"))
        .returning(|_| ok("27.1.1\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "image"))
        .returning(|args| {
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: "Error: No such image: myapp:v1".to_owned(),
            })
        });
    let runner = ContainerRunner::new(DockerClient::with_executor(mock));

    let err = runner
        .run(&spec(&["8080:80"], false), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::ImageNotFound { ref image } if image == "myapp:v1"));
    assert!(err.to_string().contains("a0ctl build"));
}

// ── Lifecycle Tests ──

#[tokio::test]
async fn detached_run_replaces_same_name_container_and_hands_off() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    mock.expect_exec()
        .withf(|args| command_is(args, "ps"))
        .times(1)
        .returning(|_| ok("beef01\tmyapp-db\nold123\tmyapp\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "rm") && args.last().is_some_and(|a| a == "old123"))
        .times(1)
        .returning(|_| ok("old123\n"));
    expect_create_and_start(&mut mock);
    mock.expect_exec()
        .withf(|args| command_is(args, "wait") || command_is(args, "stop"))
        .never();
    mock.expect_follow_output().never();
    mock.expect_exec_blocking().never();

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let outcome = runner
        .run(&spec(&["8080:80"], true), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.container_id, "c0ffee");
    assert_eq!(outcome.state, ContainerState::Detached);
}

#[tokio::test]
async fn dotted_app_name_leaves_lookalike_containers_alone() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    mock.expect_exec()
        .withf(|args| command_is(args, "ps"))
        .times(1)
        .returning(|_| ok("dead01\tmy-app\nbeef02\tmyxapp\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "rm"))
        .never();
    mock.expect_exec()
        .withf(|args| {
            let joined = args.join(" ");
            command_is(args, "create")
                && joined.contains("--name my.app")
                && args.last().is_some_and(|a| a == "my.app:v1")
        })
        .times(1)
        .returning(|_| ok("c0ffee\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "start"))
        .times(1)
        .returning(|_| ok("c0ffee\n"));

    let mut dotted = spec(&[], true);
    dotted.app_name = "my.app".to_owned();

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let outcome = runner.run(&dotted, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.state, ContainerState::Detached);
}

#[tokio::test]
async fn attached_run_waits_then_cleans_up() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    expect_create_and_start(&mut mock);
    mock.expect_follow_output()
        .withf(|args| args.join(" ") == "logs --follow c0ffee")
        .times(1)
        .returning(|_| Ok(log_lines(&["listening on :80", "GET / 200"])));
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .times(1)
        .returning(|_| ok("0\n"));
    expect_async_cleanup(&mut mock);
    mock.expect_exec_blocking().never();

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let outcome = runner
        .run(&spec(&["8080:80"], false), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.container_id, "c0ffee");
    assert_eq!(outcome.state, ContainerState::Exited(0));
}

#[tokio::test]
async fn interrupted_run_still_stops_and_removes_container() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    expect_create_and_start(&mut mock);
    mock.expect_follow_output()
        .returning(|_| Ok(log_lines(&[])));
    // The mock answers immediately, so either branch of the select may win.
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .times(0..=1)
        .returning(|_| ok("0\n"));
    expect_async_cleanup(&mut mock);
    mock.expect_exec_blocking().never();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    match runner.run(&spec(&["8080:80"], false), &cancel).await {
        Err(RunError::Cancelled { id }) => assert_eq!(id, "c0ffee"),
        Ok(outcome) => assert_eq!(outcome.state, ContainerState::Exited(0)),
        Err(other) => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn auto_removed_container_is_not_an_error_at_cleanup() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    expect_create_and_start(&mut mock);
    mock.expect_follow_output()
        .returning(|_| Ok(log_lines(&["bye"])));
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .returning(|_| ok("0\n"));
    for action in ["stop", "rm"] {
        mock.expect_exec()
            .withf(move |args| command_is(args, action))
            .times(1)
            .returning(|args| {
                Err(EngineError::CommandFailed {
                    args: args.to_vec(),
                    stderr: "Error response from daemon: No such container: c0ffee".to_owned(),
                })
            });
    }

    let mut auto_remove = spec(&["8080:80"], false);
    auto_remove.auto_remove = true;

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let outcome = runner
        .run(&auto_remove, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, ContainerState::Exited(0));
}

#[tokio::test]
async fn broken_log_stream_does_not_abort_the_run() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    expect_create_and_start(&mut mock);
    mock.expect_follow_output().returning(|args| {
        Err(EngineError::CommandFailed {
            args: args.to_vec(),
            stderr: "logs unavailable".to_owned(),
        })
    });
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .returning(|_| ok("137\n"));
    expect_async_cleanup(&mut mock);

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let outcome = runner
        .run(&spec(&["8080:80"], false), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, ContainerState::Exited(137));
}

#[tokio::test]
async fn wait_failure_still_cleans_up() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    expect_create_and_start(&mut mock);
    mock.expect_follow_output()
        .returning(|_| Ok(log_lines(&[])));
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .returning(|args| {
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: "Error response from daemon: No such container".to_owned(),
            })
        });
    expect_async_cleanup(&mut mock);

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let err = runner
        .run(&spec(&["8080:80"], false), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Wait { ref id, .. } if id == "c0ffee"));
}

#[tokio::test]
async fn start_failure_removes_the_created_container() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    expect_no_existing_container(&mut mock);
    mock.expect_exec()
        .withf(|args| command_is(args, "create"))
        .returning(|_| ok("c0ffee\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "start"))
        .returning(|args| {
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: "port is already allocated".to_owned(),
            })
        });
    mock.expect_exec_blocking()
        .withf(|args| command_is(args, "stop"))
        .times(1)
        .returning(|_| ok(""));
    mock.expect_exec_blocking()
        .withf(|args| command_is(args, "rm"))
        .times(1)
        .returning(|_| ok(""));

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let err = runner
        .run(&spec(&["8080:80"], false), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Lifecycle { action: "start", .. }));
}

#[tokio::test]
async fn sequential_runs_reuse_the_name() {
    let mut mock = MockExecutor::new();
    expect_preconditions(&mut mock);
    mock.expect_exec()
        .withf(|args| command_is(args, "ps"))
        .times(2)
        .returning(|_| ok(""));
    mock.expect_exec()
        .withf(|args| command_is(args, "create"))
        .times(2)
        .returning(|_| ok("c0ffee\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "start"))
        .times(2)
        .returning(|_| ok(""));
    mock.expect_follow_output()
        .times(2)
        .returning(|_| Ok(log_lines(&["done"])));
    mock.expect_exec()
        .withf(|args| command_is(args, "wait"))
        .times(2)
        .returning(|_| ok("0\n"));
    mock.expect_exec()
        .withf(|args| command_is(args, "stop"))
        .times(2)
        .returning(|_| ok(""));
    mock.expect_exec()
        .withf(|args| command_is(args, "rm"))
        .times(2)
        .returning(|_| ok(""));

    let runner = ContainerRunner::new(DockerClient::with_executor(mock));
    let cancel = CancellationToken::new();
    for _ in 0..2 {
        let outcome = runner.run(&spec(&[], false), &cancel).await.unwrap();
        assert_eq!(outcome.state, ContainerState::Exited(0));
    }
}

// ── Guard Tests ──

#[test]
fn dropped_guard_stops_and_removes() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_blocking()
        .withf(|args| args.join(" ") == "stop --time 3 c0ffee")
        .times(1)
        .returning(|_| ok(""));
    mock.expect_exec_blocking()
        .withf(|args| args.join(" ") == "rm --force c0ffee")
        .times(1)
        .returning(|_| ok(""));

    let client = DockerClient::with_executor(mock);
    drop(ContainerGuard::new(&client, "c0ffee"));
}

#[test]
fn disarmed_guard_leaves_container_alone() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_blocking().never();

    let client = DockerClient::with_executor(mock);
    let id = ContainerGuard::new(&client, "c0ffee").disarm();
    assert_eq!(id, "c0ffee");
}
