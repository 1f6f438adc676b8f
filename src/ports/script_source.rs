//! Artifact repository port
//!
//! The script stager only needs "GET this URL and give me status + body".

use async_trait::async_trait;

use crate::error::Result;

/// Status and fully buffered body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Only an exact 200 counts as a successful fetch
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Source of installable scripts
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// Issue a GET and buffer the whole body
    ///
    /// Non-success statuses are returned as responses, not errors; only
    /// transport failures are errors.
    async fn fetch(&self, url: &str) -> Result<HttpResponse>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_is_ok() {
        let response = |status| HttpResponse {
            status,
            body: Vec::new(),
        };
        assert!(response(200).is_ok());
        assert!(!response(204).is_ok());
        assert!(!response(301).is_ok());
        assert!(!response(404).is_ok());
    }
}
