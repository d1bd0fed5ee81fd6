//! Reddit session cookies.

use std::fmt;

/// Browser cookies that authenticate requests against reddit.com.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookies {
    reddit_session: String,
    token_v2: Option<String>,
}

impl SessionCookies {
    pub fn new(reddit_session: String, token_v2: Option<String>) -> Self {
        Self {
            reddit_session: reddit_session.trim().to_string(),
            token_v2: token_v2
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        match &self.token_v2 {
            Some(token) => format!("reddit_session={}; token_v2={}", self.reddit_session, token),
            None => format!("reddit_session={}", self.reddit_session),
        }
    }

    pub fn has_token_v2(&self) -> bool {
        self.token_v2.is_some()
    }
}

// Never print cookie values into logs.
impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("reddit_session", &"<redacted>")
            .field("token_v2", &self.token_v2.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
