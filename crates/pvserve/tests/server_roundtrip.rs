#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pvserve::client::Client;
use pvserve::wire::{ErrorKind, MetaField, Response};
use pvserve_channel::EVENT_VALUE;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pvserve-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn spawn_server(sock_path: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_pvserve"))
        .arg("--log-level")
        .arg("error")
        .arg("serve")
        .arg(sock_path)
        .arg("--poll-interval-ms")
        .arg("25")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start")
}

fn wait_for_connect(path: &Path, timeout: Duration) -> Client {
    let start = Instant::now();
    loop {
        match Client::connect(path) {
            Ok(client) => return client,
            Err(err) => {
                assert!(
                    start.elapsed() < timeout,
                    "connect timeout after {timeout:?}: {err}"
                );
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> i32 {
    let start = Instant::now();
    loop {
        match child.try_wait().expect("try_wait should succeed") {
            Some(status) => return status.code().unwrap_or(-1),
            None => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    panic!("server did not exit within {timeout:?}");
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn expect_values(response: Response) -> Vec<f64> {
    match response {
        Response::Value(body) => body.values,
        other => panic!("expected a value response, got {other:?}"),
    }
}

#[test]
fn value_round_trip_and_clean_shutdown() {
    let dir = unique_temp_dir("roundtrip");
    let sock_path = dir.join("pv.sock");
    let mut child = spawn_server(&sock_path);

    let mut client = wait_for_connect(&sock_path, Duration::from_secs(3));

    let values = expect_values(client.get("ival", &[], None).expect("get should succeed"));
    assert_eq!(values, vec![42.0]);

    let response = client.put("ival", &[7.0]).expect("put should succeed");
    assert_eq!(response, Response::Ok);
    let values = expect_values(client.get("ival", &[], None).expect("get should succeed"));
    assert_eq!(values, vec![7.0]);

    let response = client
        .get("missing", &[], None)
        .expect("request should succeed");
    assert!(matches!(
        response,
        Response::Error {
            kind: ErrorKind::NotFound,
            ..
        }
    ));

    let response = client.put("done", &[1.0]).expect("done put should succeed");
    assert_eq!(response, Response::Ok);

    let code = wait_for_exit(&mut child, Duration::from_secs(3));
    assert_eq!(code, 0, "clean shutdown via the termination flag");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn array_channel_limits_and_size_mismatch() {
    let dir = unique_temp_dir("array");
    let sock_path = dir.join("pv.sock");
    let mut child = spawn_server(&sock_path);

    let mut client = wait_for_connect(&sock_path, Duration::from_secs(3));

    let response = client
        .put("aval", &[1.0, 2.0, 3.0, 4.0, 5.0])
        .expect("array put should succeed");
    assert_eq!(response, Response::Ok);

    let values = expect_values(
        client
            .get("aval", &[], Some(5))
            .expect("array get should succeed"),
    );
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

    // A scalar request against an array channel reshapes to the full array.
    let values = expect_values(client.get("aval", &[], None).expect("get should succeed"));
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

    let response = client
        .get("aval", &[MetaField::HighLimit, MetaField::LowLimit], Some(5))
        .expect("meta get should succeed");
    let Response::Value(body) = response else {
        panic!("expected a value response, got {response:?}");
    };
    assert_eq!(body.kind, "i16");
    assert_eq!(body.high_limit, Some(i16::MAX as f64));
    assert_eq!(body.low_limit, Some(i16::MIN as f64));

    let response = client
        .put("aval", &[1.0, 2.0, 3.0])
        .expect("request should succeed");
    assert!(matches!(
        response,
        Response::Error {
            kind: ErrorKind::SizeMismatch,
            ..
        }
    ));

    let response = client.put("done", &[1.0]).expect("done put should succeed");
    assert_eq!(response, Response::Ok);
    assert_eq!(wait_for_exit(&mut child, Duration::from_secs(3)), 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn subscriber_receives_change_events() {
    let dir = unique_temp_dir("events");
    let sock_path = dir.join("pv.sock");
    let mut child = spawn_server(&sock_path);

    let mut subscriber = wait_for_connect(&sock_path, Duration::from_secs(3));
    let response = subscriber.subscribe(&[]).expect("subscribe should succeed");
    assert_eq!(response, Response::Ok);

    let mut writer = wait_for_connect(&sock_path, Duration::from_secs(3));
    let response = writer.put("ival", &[5.0]).expect("put should succeed");
    assert_eq!(response, Response::Ok);

    let message = subscriber.recv().expect("event should arrive");
    let Response::Event { mask, value } = message else {
        panic!("expected an event, got {message:?}");
    };
    assert_ne!(mask & EVENT_VALUE, 0);
    assert_eq!(value.name, "ival");
    assert_eq!(value.values, vec![5.0]);

    let response = writer.put("done", &[1.0]).expect("done put should succeed");
    assert_eq!(response, Response::Ok);
    assert_eq!(wait_for_exit(&mut child, Duration::from_secs(3)), 0);
    let _ = std::fs::remove_dir_all(&dir);
}
