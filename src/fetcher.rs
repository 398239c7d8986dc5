use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FetchCause, FetchError};

/// Raw feed text plus where it actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub body: String,
    pub url: String,
    pub via_relay: bool,
}

/// Accepts a Content-Type header when it contains any of the configured
/// substrings (case-insensitive). A missing header is always accepted, and so
/// is everything when no substrings are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeFilter {
    needles: Vec<String>,
}

impl ContentTypeFilter {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|n| n.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn accepts(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type else {
            return true;
        };
        if self.needles.is_empty() {
            return true;
        }
        let content_type = content_type.to_lowercase();
        self.needles.iter().any(|n| content_type.contains(n.as_str()))
    }
}

impl Default for ContentTypeFilter {
    fn default() -> Self {
        Self::new(["xml", "rss"])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Direct,
    Relay,
}

/// What one HTTP attempt produced, reduced to the facts that drive fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Transport(String),
    Response {
        status: u16,
        content_type: Option<String>,
    },
}

impl Observation {
    fn from_response(response: &Response) -> Self {
        Observation::Response {
            status: response.status().as_u16(),
            content_type: response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Accept,
    FallBack(FetchCause),
    Fail(FetchCause),
}

/// The direct → relay → failed cascade.
///
/// Direct attempts accept status 0 or any 2xx whose Content-Type passes the
/// filter; anything else moves on to the relay. Relay attempts only need a
/// 2xx status, and a rejected relay attempt is final.
pub fn decide(state: FetchState, observation: &Observation, filter: &ContentTypeFilter) -> Step {
    let verdict = match (state, observation) {
        (_, Observation::Transport(message)) => Err(FetchCause::Transport(message.clone())),
        (FetchState::Direct, Observation::Response { status, content_type }) => {
            if *status != 0 && !(200..300).contains(status) {
                Err(FetchCause::Status(*status))
            } else if !filter.accepts(content_type.as_deref()) {
                Err(FetchCause::ContentType(content_type.clone().unwrap_or_default()))
            } else {
                Ok(())
            }
        }
        (FetchState::Relay, Observation::Response { status, .. }) => {
            if (200..300).contains(status) {
                Ok(())
            } else {
                Err(FetchCause::Status(*status))
            }
        }
    };

    match (verdict, state) {
        (Ok(()), _) => Step::Accept,
        (Err(cause), FetchState::Direct) => Step::FallBack(cause),
        (Err(cause), FetchState::Relay) => Step::Fail(cause),
    }
}

pub struct Fetcher {
    client: Client,
    relay_base: String,
    content_filter: ContentTypeFilter,
}

impl Fetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self::with_client(
            client,
            &config.relay_base,
            ContentTypeFilter::new(&config.accepted_content_types),
        ))
    }

    pub fn with_client(client: Client, relay_base: &str, content_filter: ContentTypeFilter) -> Self {
        Self {
            client,
            relay_base: relay_base.to_string(),
            content_filter,
        }
    }

    pub fn relay_url(&self, url: &str) -> String {
        format!("{}{}", self.relay_base, urlencoding::encode(url))
    }

    /// Direct fetch, falling back to the relay once.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.run(url, FetchState::Direct).await
    }

    /// Skip the direct attempt and go through the relay.
    pub async fn fetch_via_relay(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.run(url, FetchState::Relay).await
    }

    async fn run(&self, url: &str, mut state: FetchState) -> Result<FetchResult, FetchError> {
        loop {
            let target = match state {
                FetchState::Direct => url.to_string(),
                FetchState::Relay => self.relay_url(url),
            };
            debug!("Fetching {} ({:?})", target, state);

            let (observation, body) = self.observe(&target).await;
            match decide(state, &observation, &self.content_filter) {
                Step::Accept => {
                    let body = body.unwrap_or_default();
                    info!("Fetched {} bytes from {}", body.len(), target);
                    return Ok(FetchResult {
                        body,
                        url: target,
                        via_relay: state == FetchState::Relay,
                    });
                }
                Step::FallBack(cause) => {
                    warn!("Direct fetch of {} failed ({}), trying relay", url, cause);
                    state = FetchState::Relay;
                }
                Step::Fail(cause) => {
                    return Err(FetchError {
                        url: url.to_string(),
                        cause,
                    });
                }
            }
        }
    }

    /// A body that cannot be read counts as a transport failure.
    async fn observe(&self, target: &str) -> (Observation, Option<String>) {
        let response = match self.client.get(target).send().await {
            Ok(response) => response,
            Err(e) => return (Observation::Transport(e.to_string()), None),
        };
        let observation = Observation::from_response(&response);
        match response.text().await {
            Ok(body) => (observation, Some(body)),
            Err(e) => (Observation::Transport(e.to_string()), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, content_type: Option<&str>) -> Observation {
        Observation::Response {
            status,
            content_type: content_type.map(str::to_string),
        }
    }

    mod content_type_filter_tests {
        use super::*;

        #[test]
        fn test_default_accepts_feed_types() {
            let filter = ContentTypeFilter::default();
            assert!(filter.accepts(Some("application/rss+xml; charset=utf-8")));
            assert!(filter.accepts(Some("application/atom+xml")));
            assert!(filter.accepts(Some("text/xml")));
            assert!(filter.accepts(Some("APPLICATION/XML")));
        }

        #[test]
        fn test_default_rejects_html() {
            let filter = ContentTypeFilter::default();
            assert!(!filter.accepts(Some("text/html; charset=utf-8")));
            assert!(!filter.accepts(Some("application/json")));
        }

        #[test]
        fn test_missing_header_is_accepted() {
            assert!(ContentTypeFilter::default().accepts(None));
        }

        #[test]
        fn test_empty_filter_accepts_everything() {
            let filter = ContentTypeFilter::new(Vec::<String>::new());
            assert!(filter.accepts(Some("text/html")));
        }

        #[test]
        fn test_custom_needles() {
            let filter = ContentTypeFilter::new(["atom"]);
            assert!(filter.accepts(Some("application/atom+xml")));
            assert!(!filter.accepts(Some("application/rss+xml")));
        }
    }

    mod decide_tests {
        use super::*;

        #[test]
        fn test_direct_success_is_accepted() {
            let filter = ContentTypeFilter::default();
            let step = decide(FetchState::Direct, &response(200, Some("text/xml")), &filter);
            assert_eq!(step, Step::Accept);
        }

        #[test]
        fn test_direct_status_zero_is_accepted() {
            let filter = ContentTypeFilter::default();
            assert_eq!(decide(FetchState::Direct, &response(0, None), &filter), Step::Accept);
        }

        #[test]
        fn test_direct_not_found_falls_back() {
            let filter = ContentTypeFilter::default();
            let step = decide(FetchState::Direct, &response(404, Some("text/xml")), &filter);
            assert_eq!(step, Step::FallBack(FetchCause::Status(404)));
        }

        #[test]
        fn test_direct_html_falls_back() {
            let filter = ContentTypeFilter::default();
            let step = decide(FetchState::Direct, &response(200, Some("text/html")), &filter);
            assert_eq!(
                step,
                Step::FallBack(FetchCause::ContentType("text/html".to_string()))
            );
        }

        #[test]
        fn test_direct_transport_error_falls_back() {
            let filter = ContentTypeFilter::default();
            let step = decide(
                FetchState::Direct,
                &Observation::Transport("connection refused".to_string()),
                &filter,
            );
            assert_eq!(
                step,
                Step::FallBack(FetchCause::Transport("connection refused".to_string()))
            );
        }

        #[test]
        fn test_relay_ignores_content_type() {
            let filter = ContentTypeFilter::default();
            let step = decide(FetchState::Relay, &response(200, Some("text/plain")), &filter);
            assert_eq!(step, Step::Accept);
        }

        #[test]
        fn test_relay_failure_is_final() {
            let filter = ContentTypeFilter::default();
            assert_eq!(
                decide(FetchState::Relay, &response(502, None), &filter),
                Step::Fail(FetchCause::Status(502))
            );
            assert_eq!(
                decide(FetchState::Relay, &response(0, None), &filter),
                Step::Fail(FetchCause::Status(0))
            );
        }
    }

    mod relay_url_tests {
        use super::*;

        #[test]
        fn test_relay_url_percent_encodes_source() {
            let fetcher = Fetcher::with_client(
                Client::new(),
                "https://relay.example.net/raw?url=",
                ContentTypeFilter::default(),
            );
            assert_eq!(
                fetcher.relay_url("http://marktechpost.com/feed/?a=1&b=2"),
                "https://relay.example.net/raw?url=http%3A%2F%2Fmarktechpost.com%2Ffeed%2F%3Fa%3D1%26b%3D2"
            );
        }
    }
}
