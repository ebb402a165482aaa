//! Conversions from external infrastructure errors into the domain error
//! type.

use chronarc_domain::ChronarcError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ChronarcError);

impl From<InfraError> for ChronarcError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ChronarcError> for InfraError {
    fn from(value: ChronarcError) -> Self {
        InfraError(value)
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(value: rusqlite::Error) -> Self {
        InfraError(ChronarcError::from(value))
    }
}

impl From<keyring::Error> for InfraError {
    fn from(value: keyring::Error) -> Self {
        use keyring::Error as KE;

        let mapped = match value {
            KE::NoEntry => ChronarcError::not_found("keychain entry"),
            KE::BadEncoding(_) => {
                ChronarcError::Internal("credential in keychain is not valid UTF-8".into())
            }
            other => ChronarcError::Internal(format!("keychain error: {other}")),
        };

        InfraError(mapped)
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return InfraError(ChronarcError::ProviderTransient("request timed out".into()));
        }

        if let Some(status) = value.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown"));
            let mapped = match code {
                401 | 403 => ChronarcError::ReauthRequired(message),
                404 => ChronarcError::not_found(message),
                429 | 500..=599 => ChronarcError::ProviderTransient(message),
                _ => ChronarcError::ProviderFatal(message),
            };
            return InfraError(mapped);
        }

        InfraError(ChronarcError::ProviderTransient(value.to_string()))
    }
}
