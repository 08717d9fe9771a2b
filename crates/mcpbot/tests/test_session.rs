//! End-to-end chat sessions against a fake MCP server and a mocked model

#![cfg(unix)]

mod common;

use common::{TestEnv, VANISHING_HOST};
use mockito::Matcher;
use predicates::prelude::*;

fn ollama_config(env: &TestEnv, url: &str) {
    env.write_config(&format!(
        r#"{{"provider": {{"kind": "ollama", "api_base": "{}", "model": "llama3.1"}},
            "agent": {{"max_iterations": 3}}}}"#,
        url
    ))
    .unwrap();
}

#[test]
fn test_connect_and_quit() {
    let env = TestEnv::new().unwrap();
    let server = mockito::Server::new();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command()
        .arg(&host)
        .write_stdin("\n   \nQUIT\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"Connected to server with tools: ["list_pods"]"#,
        ))
        .stdout(predicate::str::contains("Query: "));
}

#[test]
fn test_end_of_input_ends_session() {
    let env = TestEnv::new().unwrap();
    let server = mockito::Server::new();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command().arg(&host).write_stdin("").assert().success();
}

#[test]
fn test_query_gets_answer() {
    let env = TestEnv::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::Regex("how many pods\\?".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"model":"llama3.1","message":{"role":"assistant","content":"There are two pods."},"done":true}"#,
        )
        .create();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command()
        .arg(&host)
        .write_stdin("how many pods?\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("There are two pods."));

    mock.assert();
}

#[test]
fn test_provider_failure_returns_to_prompt() {
    let env = TestEnv::new().unwrap();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body(r#"{"error": "model crashed"}"#)
        .expect(2)
        .create();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command()
        .arg(&host)
        .write_stdin("first\nsecond\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error calling the completion API").count(2));
}

#[test]
fn test_undecodable_line_does_not_end_session() {
    let env = TestEnv::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"model":"llama3.1","message":{"role":"assistant","content":"Answer for you."},"done":true}"#,
        )
        .expect(2)
        .create();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command()
        .arg(&host)
        .write_stdin(&b"caf\xe9 pods\nsecond\nquit\n"[..])
        .assert()
        .success()
        .stdout(predicate::str::contains("Answer for you.").count(2));

    mock.assert();
}

#[test]
fn test_lost_host_reports_error_and_returns_to_prompt() {
    let env = TestEnv::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/api/chat").expect(0).create();
    ollama_config(&env, &server.url());
    let host = env.host_script("vanishing-host", VANISHING_HOST).unwrap();

    env.command()
        .arg(&host)
        .write_stdin("list pods\nlist pods again\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"Connected to server with tools: ["list_pods"]"#,
        ))
        .stdout(predicate::str::contains("Tool host unavailable").count(2))
        .stdout(predicate::str::contains("Query: ").count(3));

    mock.assert();
}

#[test]
fn test_verbose_logs_selected_model() {
    let env = TestEnv::new().unwrap();
    let server = mockito::Server::new();
    ollama_config(&env, &server.url());
    let host = env.fake_host().unwrap();

    env.command()
        .arg("--verbose")
        .arg(&host)
        .write_stdin("quit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Using ollama model llama3.1"));
}
