//! Push endpoint addressing.
//!
//! The gateway exposes a management endpoint per domain and stage; pushing
//! to a connection means posting to
//! `https://{domain}/{stage}/@connections/{connectionId}`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// Endpoint
// ============================================================================

/// Where a connection was established, needed to address pushes to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Gateway domain name.
    pub domain_name: String,
    /// Deployment stage.
    pub stage: String,
}

impl Endpoint {
    /// Creates an endpoint.
    #[inline]
    #[must_use]
    pub fn new(domain_name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            stage: stage.into(),
        }
    }

    /// Returns the management URL of the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the domain does not form a valid URL.
    pub fn management_url(&self) -> Result<Url> {
        let base = format!("https://{}/", self.domain_name);
        let mut url = Url::parse(&base)
            .map_err(|e| Error::config(format!("Invalid endpoint domain '{}': {e}", self.domain_name)))?;

        if !self.stage.is_empty() {
            url.path_segments_mut()
                .map_err(|()| Error::config("Endpoint URL cannot be a base"))?
                .pop_if_empty()
                .push(&self.stage);
        }

        Ok(url)
    }

    /// Returns the URL used to push to, inspect or drop one connection.
    ///
    /// The connection ID is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the domain does not form a valid URL.
    pub fn connection_url(&self, connection_id: &ConnectionId) -> Result<Url> {
        let mut url = self.management_url()?;
        url.path_segments_mut()
            .map_err(|()| Error::config("Endpoint URL cannot be a base"))?
            .pop_if_empty()
            .push("@connections")
            .push(connection_id.as_str());
        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_management_url() {
        let endpoint = Endpoint::new("test.execute-api.ap-southeast-1.amazonaws.com", "Prod");
        let url = endpoint.management_url().expect("url");
        assert_eq!(
            url.as_str(),
            "https://test.execute-api.ap-southeast-1.amazonaws.com/Prod"
        );
    }

    #[test]
    fn test_connection_url_encodes_id() {
        let endpoint = Endpoint::new("abc.example.com", "dev");
        let url = endpoint
            .connection_url(&ConnectionId::new("d1Bz/cMO=="))
            .expect("url");

        assert!(url.as_str().starts_with("https://abc.example.com/dev/@connections/"));
        assert!(url.path().ends_with("/@connections/d1Bz%2FcMO=="));
    }

    #[test]
    fn test_invalid_domain() {
        let endpoint = Endpoint::new("bad domain", "dev");
        assert!(endpoint.management_url().is_err());
    }

    #[test]
    fn test_endpoint_serde_camel_case() {
        let endpoint = Endpoint::new("abc.example.com", "dev");
        let json = serde_json::to_value(&endpoint).expect("serialize");
        assert_eq!(json["domainName"], "abc.example.com");
        assert_eq!(json["stage"], "dev");
    }
}
