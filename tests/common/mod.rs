// Shared fixtures for the router tests.
#![allow(dead_code)]

use axum_test::TestServer;
use futures::future::BoxFuture;
use nest_ai::auth::{RouteGuard, StaticIdentityProvider};
use nest_ai::config::DEFAULT_PROTECTED_PREFIXES;
use nest_ai::{build_router, AppState, CompletionError, CompletionModel};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-session";
pub const USER: &str = "alice";

/// Model double that records every prompt it is asked to complete.
pub struct RecordingModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionModel for RecordingModel {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, CompletionError>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let result = self.reply.clone().ok_or(CompletionError::EmptyResponse);
        Box::pin(async move { result })
    }
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn app_with_model(model: Arc<dyn CompletionModel>) -> TestServer {
    let state = AppState::new(
        manifest_dir().join("templates"),
        model,
        Arc::new(StaticIdentityProvider::new([(TOKEN, USER)])),
        RouteGuard::new(DEFAULT_PROTECTED_PREFIXES.iter().copied(), "/sign-in"),
    );
    let app = build_router(state, &manifest_dir().join("static"));
    TestServer::new(app).unwrap()
}

pub fn bearer() -> (axum::http::HeaderName, axum::http::HeaderValue) {
    (
        axum::http::header::AUTHORIZATION,
        axum::http::HeaderValue::from_str(&format!("Bearer {}", TOKEN)).unwrap(),
    )
}
