use tracing::{error, warn};

use crate::error::{FeedError, ParseError};
use crate::fetcher::{FetchResult, Fetcher};
use crate::xml::XmlDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    RefetchViaRelay,
    GiveUp,
}

/// A parsed feed and whether its text ended up coming through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub document: XmlDocument,
    pub via_relay: bool,
}

/// What to do when fetched text is not well-formed XML.
pub fn recovery_for(via_relay: bool) -> Recovery {
    if via_relay {
        Recovery::GiveUp
    } else {
        Recovery::RefetchViaRelay
    }
}

/// Parse fetched feed text, re-fetching once through the relay when text that
/// came directly from the source turns out to be malformed.
pub async fn parse_feed(
    fetcher: &Fetcher,
    source_url: &str,
    fetched: FetchResult,
) -> Result<ParsedFeed, FeedError> {
    let err = match XmlDocument::parse(&fetched.body) {
        Ok(document) => {
            return Ok(ParsedFeed {
                document,
                via_relay: fetched.via_relay,
            })
        }
        Err(err) => err,
    };
    error!("Error parsing XML from {}: {}", fetched.url, err);

    match recovery_for(fetched.via_relay) {
        Recovery::GiveUp => Err(FeedError::from(ParseError {
            url: source_url.to_string(),
            reason: err.to_string(),
        })),
        Recovery::RefetchViaRelay => {
            warn!("Direct fetch of {} did not parse, trying relay", source_url);
            let relayed = fetcher.fetch_via_relay(source_url).await?;
            let document = XmlDocument::parse(&relayed.body).map_err(|err| {
                error!("Error parsing XML from relay for {}: {}", source_url, err);
                FeedError::from(ParseError {
                    url: source_url.to_string(),
                    reason: format!("{} (even through relay)", err),
                })
            })?;
            Ok(ParsedFeed {
                document,
                via_relay: true,
            })
        }
    }
}
