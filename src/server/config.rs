//! Server Configuration
//!
//! Configuration is loaded from environment variables with development
//! defaults where a default is safe. Missing optional configuration is
//! logged and the server continues; only outright malformed values fall
//! back with a warning.

use crate::auth::TokenVerifier;

/// Listen port, from `SERVER_PORT` (default 3000)
pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|raw| match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!("SERVER_PORT is not a valid port, using 3000");
                None
            }
        })
        .unwrap_or(3000)
}

/// Build the token verifier from `JWT_SECRET` / `JWT_AUDIENCE`
///
/// The development fallbacks keep a local server bootable without any
/// environment; production deployments set both.
pub fn load_verifier() -> TokenVerifier {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development secret");
        "dev-secret-change-in-production".to_string()
    });
    let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| {
        tracing::warn!("JWT_AUDIENCE not set, using 'lagoon'");
        "lagoon".to_string()
    });
    TokenVerifier::new(secret, audience)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_port_default() {
        std::env::remove_var("SERVER_PORT");
        assert_eq!(server_port(), 3000);
    }

    #[test]
    #[serial]
    fn test_server_port_from_env() {
        std::env::set_var("SERVER_PORT", "8080");
        assert_eq!(server_port(), 8080);
        std::env::remove_var("SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_server_port_rejects_garbage() {
        std::env::set_var("SERVER_PORT", "not-a-port");
        assert_eq!(server_port(), 3000);
        std::env::remove_var("SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_load_verifier_uses_env() {
        std::env::set_var("JWT_SECRET", "s3cret");
        std::env::set_var("JWT_AUDIENCE", "my-app");
        let verifier = load_verifier();

        let token = crate::auth::mint_token("s3cret", "my-app", "s1", "a@x.io", None).unwrap();
        assert!(verifier.verify(&token).is_ok());

        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("JWT_AUDIENCE");
    }
}
