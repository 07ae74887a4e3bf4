use crate::Provider;
use thiserror::Error;

/// Failure of a single provider call, tagged with the provider that produced it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("{provider} API error: {status}")]
    Http { provider: Provider, status: u16 },

    #[error("{provider} API error: {message}")]
    Api { provider: Provider, message: String },

    #[error("{provider} request timed out")]
    Timeout { provider: Provider },

    #[error("{provider} network error: {message}")]
    Network { provider: Provider, message: String },

    #[error("{provider} returned an unexpected payload: {message}")]
    Decode { provider: Provider, message: String },

    #[error("{provider}: {what} not found")]
    NotFound { provider: Provider, what: String },
}

impl FetchError {
    pub fn provider(&self) -> Provider {
        match self {
            FetchError::Http { provider, .. }
            | FetchError::Api { provider, .. }
            | FetchError::Timeout { provider }
            | FetchError::Network { provider, .. }
            | FetchError::Decode { provider, .. }
            | FetchError::NotFound { provider, .. } => *provider,
        }
    }

    pub fn api(provider: Provider, message: impl Into<String>) -> Self {
        FetchError::Api {
            provider,
            message: message.into(),
        }
    }

    pub fn decode(provider: Provider, err: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            provider,
            message: err.to_string(),
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_provider_tag() {
        let err = FetchError::Http {
            provider: Provider::Binance,
            status: 429,
        };
        assert_eq!(err.to_string(), "Binance API error: 429");
        let err = FetchError::api(Provider::Coinglass, "Upgrade plan");
        assert_eq!(err.to_string(), "Coinglass API error: Upgrade plan");
        assert_eq!(err.provider(), Provider::Coinglass);
    }
}
