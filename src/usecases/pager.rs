//! Transaction Pager - Full History Retrieval
//!
//! The transactions endpoint never returns records directly. It
//! returns a summary whose `pages` list holds id-range links; each
//! link's `from` id is the cursor for a `sinceid` request that yields
//! the actual transactions. Pages are fetched strictly in listed
//! order and concatenated as-is.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::{BrokerError, BrokerResult};
use crate::domain::raw;
use crate::ports::transport::{BrokerTransport, Endpoint, Params};

/// Summary `from` used when the caller gives no lower bound, so the
/// broker does not silently default to the last week.
pub const EPOCH_START: &str = "1970-01-01T00:00:00.000Z";

/// Pulls the complete transaction history behind a summary request.
pub struct TransactionPager<T: BrokerTransport> {
  /// Transport port.
  transport: Arc<T>,
  /// Default `pageSize` for the summary request.
  page_size: Option<u32>,
  /// Page counter.
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<T: BrokerTransport> TransactionPager<T> {
  /// Create a pager over a transport.
  pub fn new(transport: Arc<T>, page_size: Option<u32>) -> Self {
    Self {
      transport,
      page_size,
      metrics: None,
    }
  }

  /// Attach a metrics registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Fetch every transaction from `since` (ms) onwards.
  ///
  /// `limit` overrides the configured page size. Caller `params`
  /// (a `type` filter, for instance) are forwarded to the summary
  /// request and to every page request, minus any `id`.
  ///
  /// # Errors
  /// - `MalformedPageLink` when a page link is not a string or has no
  ///   readable cursor; no page is requested in that case
  /// - `MalformedResponse` when the summary's `pages` is not a list
  /// - `Transport` when the summary or any page request fails; nothing
  ///   partial is returned
  #[instrument(skip(self, params))]
  pub async fn fetch(
    &self,
    since: Option<i64>,
    limit: Option<u32>,
    params: &Params,
  ) -> BrokerResult<Vec<Value>> {
    let mut summary_params = Params::new();
    let from = match since {
      Some(ms) => raw::iso8601(ms)
        .ok_or_else(|| BrokerError::ArgumentsRequired(format!("since {ms} out of range")))?,
      None => EPOCH_START.to_string(),
    };
    summary_params.insert("from".into(), Value::String(from));
    if let Some(size) = limit.or(self.page_size) {
      summary_params.insert("pageSize".into(), Value::from(size));
    }
    for (key, value) in params {
      summary_params.insert(key.clone(), value.clone());
    }

    let summary = self
      .transport
      .request(Endpoint::Transactions, &summary_params)
      .await?;

    let boundaries = page_links(&summary)?
      .into_iter()
      .map(page_boundary)
      .collect::<BrokerResult<Vec<_>>>()?;
    debug!(pages = boundaries.len(), "Transaction summary received");

    let mut page_params = params.clone();
    page_params.remove("id");

    let mut seen = HashSet::new();
    let mut transactions = Vec::new();

    for boundary in boundaries {
      let mut request = Params::new();
      request.insert("id".into(), Value::String(boundary.to_string()));
      for (key, value) in &page_params {
        request.insert(key.clone(), value.clone());
      }

      let page = self
        .transport
        .request(Endpoint::TransactionsSinceId, &request)
        .await?;
      if let Some(metrics) = &self.metrics {
        metrics.pages_fetched.inc();
      }

      let records = page
        .get("transactions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
      for record in records {
        if let Some(id) = raw::string(&record, "id") {
          if !seen.insert(id) {
            continue;
          }
        }
        transactions.push(record);
      }
    }

    info!(count = transactions.len(), "Transaction history fetched");
    Ok(transactions)
  }
}

/// Page links listed by a summary response. A missing `pages` key
/// means an empty history.
///
/// # Errors
/// - `MalformedResponse` when `pages` is not an array
/// - `MalformedPageLink` for any entry that is not a string
pub fn page_links(summary: &Value) -> BrokerResult<Vec<&str>> {
  let Some(pages) = summary.get("pages") else {
    return Ok(Vec::new());
  };
  let links = pages
    .as_array()
    .ok_or_else(|| BrokerError::MalformedResponse(format!("pages is not a list: {pages}")))?;
  links
    .iter()
    .map(|link| {
      link
        .as_str()
        .ok_or_else(|| BrokerError::MalformedPageLink(link.to_string()))
    })
    .collect()
}

/// Cursor id carried by a page link's `from` query parameter.
///
/// # Errors
/// `MalformedPageLink` when the link is not a URL or `from` is not
/// a non-negative integer.
pub fn page_boundary(link: &str) -> BrokerResult<u64> {
  let url = Url::parse(link).map_err(|_| BrokerError::MalformedPageLink(link.to_string()))?;
  url
    .query_pairs()
    .find(|(key, _)| key == "from")
    .and_then(|(_, value)| value.parse::<u64>().ok())
    .ok_or_else(|| BrokerError::MalformedPageLink(link.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_boundary() {
    let link = "https://api-fxtrade.oanda.com/v3/accounts/001-004-1234567-001/transactions/idrange?from=104&to=160";
    assert_eq!(page_boundary(link).unwrap(), 104);
    assert_eq!(
      page_boundary("https://h/v3/idrange?to=9&from=7").unwrap(),
      7
    );
  }

  #[test]
  fn test_malformed_page_links() {
    for link in [
      "https://h/v3/idrange?to=160",
      "https://h/v3/idrange?from=abc&to=160",
      "not a url",
    ] {
      assert_eq!(
        page_boundary(link).unwrap_err(),
        BrokerError::MalformedPageLink(link.to_string())
      );
    }
  }

  #[test]
  fn test_page_links_shapes() {
    assert!(page_links(&serde_json::json!({"count": "0"})).unwrap().is_empty());
    assert_eq!(
      page_links(&serde_json::json!({"pages": ["https://h/v3/idrange?from=1&to=3"]})).unwrap(),
      ["https://h/v3/idrange?from=1&to=3"]
    );
    assert_eq!(
      page_links(&serde_json::json!({"pages": ["https://h/v3/idrange?from=1&to=3", 42]}))
        .unwrap_err(),
      BrokerError::MalformedPageLink("42".to_string())
    );
    assert!(matches!(
      page_links(&serde_json::json!({"pages": "https://h/v3/idrange?from=1&to=3"})),
      Err(BrokerError::MalformedResponse(_))
    ));
  }
}
