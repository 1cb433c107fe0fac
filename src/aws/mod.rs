use std::time::{Duration, SystemTime};

use aws_smithy_types::DateTime;

pub mod credentials;
pub mod sts;

/// Provider name stamped on credentials handed to SDK clients
pub const PROVIDER_NAME: &str = "WebIdentityFederation";

/// AWS temporary credentials structure
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl Credentials {
    /// Whether the credentials expire within `window` from now.
    ///
    /// An expiration that cannot be represented as a system time counts as
    /// expiring, which forces a refresh rather than trusting it.
    pub fn expires_within(&self, window: Duration) -> bool {
        let expires_at = match SystemTime::try_from(self.expiration) {
            Ok(at) => at,
            Err(_) => return true,
        };

        match expires_at.duration_since(SystemTime::now()) {
            Ok(remaining) => remaining <= window,
            Err(_) => true,
        }
    }

    /// Convert into the SDK credential type accepted by service clients.
    pub fn into_sdk(self) -> aws_credential_types::Credentials {
        let expires_after = SystemTime::try_from(self.expiration).ok();
        aws_credential_types::Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            Some(self.session_token),
            expires_after,
            PROVIDER_NAME,
        )
    }
}
