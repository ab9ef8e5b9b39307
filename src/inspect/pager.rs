//! Offset paging over a dataset's records endpoint.

use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::config::AuditConfig;
use crate::source::{PortalClient, TransportError};

pub const EXCLUDED_EXPORT_MESSAGE: &str = "Intentionally skipped. Dataset is a spreadsheet export, \
not tabular records; the portal endlessly returns empty JSON objects for it.";

/// Position within one dataset's pagination. Reset for each dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: usize,
    pub records_seen: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    Records {
        url: String,
        batch: Vec<Value>,
        fields_header: Option<String>,
    },
    Empty {
        url: String,
        fields_header: Option<String>,
    },
    TransportError(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Continue,
    Finished,
}

pub struct Pager<'a> {
    client: &'a dyn PortalClient,
    root_url: &'a str,
    page_limit: usize,
    cooldown: Duration,
    excluded_name_prefixes: &'a [String],
}

impl<'a> Pager<'a> {
    pub fn new(client: &'a dyn PortalClient, config: &'a AuditConfig) -> Self {
        Self {
            client,
            root_url: &config.root_url,
            page_limit: config.page_limit,
            cooldown: config.cooldown(),
            excluded_name_prefixes: &config.excluded_name_prefixes,
        }
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// Names of non-tabular exports are matched before any request is made.
    pub fn excluded_export(&self, dataset_name: &str) -> Option<&'static str> {
        self.excluded_name_prefixes
            .iter()
            .any(|prefix| dataset_name.starts_with(prefix.as_str()))
            .then_some(EXCLUDED_EXPORT_MESSAGE)
    }

    /// `$offset` only appears once a full first page has been read.
    pub fn page_url(&self, api_id: &str, cursor: &PageCursor) -> String {
        if cursor.records_seen >= self.page_limit {
            format!(
                "{}{}.json?$limit={}&$offset={}",
                self.root_url, api_id, self.page_limit, cursor.offset
            )
        } else {
            format!("{}{}.json?$limit={}", self.root_url, api_id, self.page_limit)
        }
    }

    pub fn next_page(&self, api_id: &str, cursor: &PageCursor) -> PageResult {
        let url = self.page_url(api_id, cursor);
        let page = match self.client.fetch(&url) {
            Ok(page) => page,
            Err(err) => return PageResult::TransportError(err),
        };
        match page.body {
            Value::Array(batch) if batch.is_empty() => PageResult::Empty {
                url,
                fields_header: page.fields_header,
            },
            Value::Array(batch) => PageResult::Records {
                url,
                batch,
                fields_header: page.fields_header,
            },
            _ => PageResult::TransportError(TransportError {
                reason: "unexpected response payload, expected a JSON array of records".to_string(),
                url,
            }),
        }
    }

    /// Record a page of `count` records. A full page moves the offset forward and
    /// waits out the cooldown before the caller asks for the next one.
    pub fn advance(&self, cursor: &mut PageCursor, count: usize) -> PageStep {
        cursor.records_seen += count;
        if count == self.page_limit {
            cursor.offset += count;
            if !self.cooldown.is_zero() {
                thread::sleep(self.cooldown);
            }
            PageStep::Continue
        } else {
            PageStep::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FetchedPage;
    use serde_json::json;

    struct Fixed(Value);

    impl PortalClient for Fixed {
        fn fetch(&self, _url: &str) -> Result<FetchedPage, TransportError> {
            Ok(FetchedPage::new(self.0.clone(), None))
        }
    }

    fn config(limit: usize) -> AuditConfig {
        AuditConfig {
            root_url: "https://portal/resource/".to_string(),
            page_limit: limit,
            cooldown_ms: 0,
            ..AuditConfig::default()
        }
    }

    #[test]
    fn offset_added_only_after_first_full_page() {
        let config = config(20_000);
        let client = Fixed(json!([]));
        let pager = Pager::new(&client, &config);
        let mut cursor = PageCursor::default();
        assert_eq!(
            pager.page_url("abcd-1234", &cursor),
            "https://portal/resource/abcd-1234.json?$limit=20000"
        );
        assert_eq!(pager.advance(&mut cursor, 20_000), PageStep::Continue);
        assert_eq!(
            pager.page_url("abcd-1234", &cursor),
            "https://portal/resource/abcd-1234.json?$limit=20000&$offset=20000"
        );
        assert_eq!(pager.advance(&mut cursor, 20_000), PageStep::Continue);
        assert_eq!(cursor.offset, 40_000);
        assert_eq!(pager.advance(&mut cursor, 7), PageStep::Finished);
        assert_eq!(cursor.records_seen, 40_007);
        assert_eq!(cursor.offset, 40_000);
    }

    #[test]
    fn full_page_waits_out_the_cooldown() {
        let config = AuditConfig {
            cooldown_ms: 50,
            ..config(2)
        };
        let client = Fixed(json!([]));
        let pager = Pager::new(&client, &config);
        let mut cursor = PageCursor::default();

        let started = std::time::Instant::now();
        assert_eq!(pager.advance(&mut cursor, 2), PageStep::Continue);
        assert!(started.elapsed() >= Duration::from_millis(50));

        let started = std::time::Instant::now();
        assert_eq!(pager.advance(&mut cursor, 1), PageStep::Finished);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn excluded_prefix_matches_name_start_only() {
        let config = config(10);
        let client = Fixed(json!([]));
        let pager = Pager::new(&client, &config);
        assert!(pager
            .excluded_export("Maryland Statewide Vehicle Crashes - FY18")
            .is_some());
        assert!(pager
            .excluded_export("Vehicle Crashes: Maryland Statewide Vehicle Crashes")
            .is_none());
    }

    #[test]
    fn object_payload_is_a_transport_problem() {
        let config = config(10);
        let client = Fixed(json!({"error": true, "message": "not found"}));
        let pager = Pager::new(&client, &config);
        match pager.next_page("abcd-1234", &PageCursor::default()) {
            PageResult::TransportError(err) => {
                assert_eq!(err.url, "https://portal/resource/abcd-1234.json?$limit=10");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn empty_array_is_empty_result() {
        let config = config(10);
        let client = Fixed(json!([]));
        let pager = Pager::new(&client, &config);
        assert!(matches!(
            pager.next_page("abcd-1234", &PageCursor::default()),
            PageResult::Empty { .. }
        ));
    }
}
