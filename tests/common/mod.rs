#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use nullwatch::config::AuditConfig;
use nullwatch::source::{FetchedPage, PortalClient, TransportError};
use serde_json::Value;

pub const ROOT: &str = "https://portal.test/resource/";

/// Config pointed at the fake portal, with no cooldown and no fallback documents.
pub fn test_config(page_limit: usize) -> AuditConfig {
    AuditConfig {
        root_url: ROOT.to_string(),
        page_limit,
        cooldown_ms: 0,
        workers: 2,
        fallback_schemas: Vec::new(),
        ..AuditConfig::default()
    }
}

pub fn first_page_url(api_id: &str, limit: usize) -> String {
    format!("{ROOT}{api_id}.json?$limit={limit}")
}

pub fn offset_page_url(api_id: &str, limit: usize, offset: usize) -> String {
    format!("{ROOT}{api_id}.json?$limit={limit}&$offset={offset}")
}

/// Answers from a fixed url -> response table and records every request.
/// Unknown urls answer 404; urls registered with `panic_on` panic.
#[derive(Default)]
pub struct ScriptedPortal {
    responses: HashMap<String, Result<FetchedPage, TransportError>>,
    panics: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, body: Value, manifest: Option<&str>) -> Self {
        self.responses.insert(
            url.into(),
            Ok(FetchedPage::new(body, manifest.map(str::to_string))),
        );
        self
    }

    pub fn failure(mut self, url: impl Into<String>, code: u16) -> Self {
        let url = url.into();
        self.responses
            .insert(url.clone(), Err(TransportError::status(&url, code)));
        self
    }

    pub fn panic_on(mut self, url: impl Into<String>) -> Self {
        self.panics.push(url.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

impl PortalClient for ScriptedPortal {
    fn fetch(&self, url: &str) -> Result<FetchedPage, TransportError> {
        self.requests.lock().expect("request log").push(url.to_string());
        if self.panics.iter().any(|u| u == url) {
            panic!("scripted panic for {url}");
        }
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::status(url, 404)))
    }
}
