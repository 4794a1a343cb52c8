// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// End-to-end runs of the supervisor and generator binaries.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use colouring_channel::{ChannelConfig, ChannelHandle};

const SUPERVISOR: &str = env!("CARGO_BIN_EXE_supervisor");
const GENERATOR: &str = env!("CARGO_BIN_EXE_generator");

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_config(prefix: &str) -> ChannelConfig {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let config = ChannelConfig::new(format!("{prefix}_{}_{n}", std::process::id()));
    ChannelHandle::clear_storage(&config);
    config
}

fn spawn_supervisor(config: &ChannelConfig) -> Child {
    Command::new(SUPERVISOR)
        .arg("--name")
        .arg(config.name())
        .env_remove("COLOURING_CAPACITY")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn supervisor")
}

fn spawn_generator(config: &ChannelConfig, edges: &str, seed: u64) -> Child {
    Command::new(GENERATOR)
        .arg("--name")
        .arg(config.name())
        .arg("--seed")
        .arg(seed.to_string())
        .args(edges.split_whitespace())
        .env_remove("COLOURING_CAPACITY")
        .env("RUST_LOG", "info")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn generator")
}

/// Poll until the supervisor's objects can be opened.
fn wait_for_channel(config: &ChannelConfig) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match ChannelHandle::attach(config) {
            Ok(probe) => {
                probe.close().expect("close probe");
                return;
            }
            Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
            Err(e) => panic!("channel never appeared: {e}"),
        }
    }
}

/// Block until the generator logs its attach, handing back the rest of stderr.
fn wait_for_attach(child: &mut Child) -> BufReader<ChildStderr> {
    let mut stderr = BufReader::new(child.stderr.take().expect("piped stderr"));
    let mut line = String::new();
    loop {
        line.clear();
        let n = stderr.read_line(&mut line).expect("read generator log");
        assert!(n > 0, "generator exited before attaching");
        if line.contains("attached to channel") {
            return stderr;
        }
    }
}

fn wait_with_deadline(child: &mut Child, secs: u64) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(secs);
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("child {} did not exit in time", child.id());
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Send `sig` once and wait for the exit. The handler is installed before
/// the channel exists, so callers signal only after `wait_for_channel`.
fn signal_and_wait(child: &mut Child, sig: libc::c_int) -> ExitStatus {
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, sig) };
    assert_eq!(rc, 0, "kill failed");
    wait_with_deadline(child, 10)
}

fn read_all(stream: Option<impl Read>) -> String {
    let mut out = String::new();
    if let Some(mut s) = stream {
        s.read_to_string(&mut out).expect("read child output");
    }
    out
}

#[test]
fn triangle_run_ends_with_colouring() {
    let config = unique_config("proc_triangle");
    let mut supervisor = spawn_supervisor(&config);
    wait_for_channel(&config);

    let mut generator = spawn_generator(&config, "0-1 1-2 2-0", 1);

    let status = wait_with_deadline(&mut supervisor, 30);
    let stdout = read_all(supervisor.stdout.take());
    assert!(status.success(), "supervisor failed: {}", read_all(supervisor.stderr.take()));
    assert!(stdout.contains("The given graph is 3-colourable."), "stdout: {stdout}");

    let status = wait_with_deadline(&mut generator, 30);
    assert!(status.success(), "generator failed: {}", read_all(generator.stderr.take()));

    assert!(ChannelHandle::attach(&config).is_err(), "names must be removed");
}

#[test]
fn sigint_shuts_supervisor_down_cleanly() {
    let config = unique_config("proc_sigint");
    let mut supervisor = spawn_supervisor(&config);
    wait_for_channel(&config);

    let status = signal_and_wait(&mut supervisor, libc::SIGINT);
    assert!(status.success(), "supervisor failed: {}", read_all(supervisor.stderr.take()));
    let stdout = read_all(supervisor.stdout.take());
    assert!(!stdout.contains("3-colourable"), "stdout: {stdout}");

    assert!(ChannelHandle::attach(&config).is_err(), "names must be removed");
}

#[test]
fn sigterm_releases_blocked_generators() {
    // K4 has no 3-colouring, so only the signal ends the run.
    let config = unique_config("proc_k4");
    let mut supervisor = spawn_supervisor(&config);
    wait_for_channel(&config);

    let k4 = "0-1 0-2 0-3 1-2 1-3 2-3";
    let mut generators = [spawn_generator(&config, k4, 7), spawn_generator(&config, k4, 8)];
    let mut logs: Vec<_> = generators.iter_mut().map(wait_for_attach).collect();

    let status = signal_and_wait(&mut supervisor, libc::SIGTERM);
    assert!(status.success(), "supervisor failed: {}", read_all(supervisor.stderr.take()));
    let stdout = read_all(supervisor.stdout.take());
    assert!(!stdout.contains("3-colourable"), "stdout: {stdout}");

    for (g, log) in generators.iter_mut().zip(logs.iter_mut()) {
        let status = wait_with_deadline(g, 30);
        assert!(status.success(), "generator failed: {}", read_all(Some(log)));
    }
    assert!(ChannelHandle::attach(&config).is_err(), "names must be removed");
}

#[test]
fn malformed_edge_fails_before_attaching() {
    let config = unique_config("proc_malformed");
    let mut generator = spawn_generator(&config, "0-1 x 1-2", 3);

    let status = wait_with_deadline(&mut generator, 10);
    assert!(!status.success());
    let stderr = read_all(generator.stderr.take());
    assert!(stderr.contains("malformed"), "stderr: {stderr}");
}

#[test]
fn generator_without_supervisor_fails() {
    let config = unique_config("proc_orphan");
    let mut generator = spawn_generator(&config, "0-1", 3);

    let status = wait_with_deadline(&mut generator, 10);
    assert!(!status.success());
}

#[test]
fn second_supervisor_on_same_name_fails() {
    let config = unique_config("proc_twice");
    let mut first = spawn_supervisor(&config);
    wait_for_channel(&config);

    let mut second = spawn_supervisor(&config);
    let status = wait_with_deadline(&mut second, 10);
    assert!(!status.success());

    // The failed attempt must not have removed the running channel.
    wait_for_channel(&config);
    let status = signal_and_wait(&mut first, libc::SIGINT);
    assert!(status.success());
    assert!(ChannelHandle::attach(&config).is_err());
}
