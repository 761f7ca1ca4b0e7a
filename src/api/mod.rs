//! Wire payloads and endpoint routing for the Jerry backend.

pub mod client;

pub use client::{Backend, HttpClient, HttpError, Payload};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Backend operations the client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AskAi,
    GenerateImage,
    Login,
    GoogleLogin,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AskAi => "api/ask-ai",
            Endpoint::GenerateImage => "api/generate-image",
            Endpoint::Login => "auth/login",
            Endpoint::GoogleLogin => "auth/google",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::AskAi => "ask-ai",
            Endpoint::GenerateImage => "generate-image",
            Endpoint::Login => "login",
            Endpoint::GoogleLogin => "google",
        }
    }
}

/// Join a base URL and an endpoint path without doubling or dropping slashes.
pub fn endpoint_url(base_url: &str, endpoint: Endpoint) -> String {
    let base = base_url.trim_end_matches('/');
    let path = endpoint.path().trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_handles_trailing_slashes() {
        assert_eq!(
            endpoint_url("http://localhost:5000", Endpoint::AskAi),
            "http://localhost:5000/api/ask-ai"
        );
        assert_eq!(
            endpoint_url("http://localhost:5000///", Endpoint::GenerateImage),
            "http://localhost:5000/api/generate-image"
        );
        assert_eq!(
            endpoint_url("https://jerry.example/base/", Endpoint::GoogleLogin),
            "https://jerry.example/base/auth/google"
        );
    }
}
