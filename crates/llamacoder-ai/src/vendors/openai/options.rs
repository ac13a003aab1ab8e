use std::collections::BTreeMap;

/// Per-request OpenAI-compatible options that are not part of the chat
/// payload itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OpenAiRequestOptions {
    /// Extra HTTP headers sent with the request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl OpenAiRequestOptions {
    /// Adds one header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attribution and Helicone observability headers for a chat session.
    pub fn helicone(helicone_key: &str, session_id: &str) -> Self {
        Self::default()
            .header("HTTP-Referer", "https://llamacoder.io")
            .header("X-Title", "LlamaCoder")
            .header("Helicone-Auth", format!("Bearer {helicone_key}"))
            .header("Helicone-Property-appname", "LlamaCoder")
            .header("Helicone-Session-Id", session_id)
            .header("Helicone-Session-Name", "LlamaCoder Chat")
    }

    /// Helicone headers when `HELICONE_API_KEY` is set, otherwise none.
    pub fn helicone_from_env(session_id: &str) -> Self {
        match std::env::var("HELICONE_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self::helicone(key.trim(), session_id),
            _ => Self::default(),
        }
    }
}
