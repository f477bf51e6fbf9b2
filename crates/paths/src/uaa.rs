//! UAA (User Account and Authentication) paths
//!
//! The UAA base URL is not fixed; it is advertised by the CF API root
//! document under `links.login.href`.

pub const DEFAULT_CLIENT_ID: &str = "cf";

pub fn token() -> String {
    "/oauth/token".to_string()
}
