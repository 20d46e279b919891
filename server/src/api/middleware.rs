//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::types::ApiError;
use crate::core::config::is_all_interfaces;

/// Browser origins permitted to call the API with credentials
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Origins for the bound host, plus the UI dev server on `port + 1`
    pub fn new(host: &str, port: u16) -> Self {
        let dev_port = port.saturating_add(1);
        let is_all = is_all_interfaces(host);

        let base_hosts: Vec<&str> = if is_all || host == "127.0.0.1" || host == "localhost" {
            vec!["localhost", "127.0.0.1"]
        } else {
            vec![host]
        };

        let mut origins = Vec::new();
        for h in &base_hosts {
            origins.push(format!("http://{}:{}", h, port));
            origins.push(format!("http://{}:{}", h, dev_port));
        }

        // LAN addresses when listening on every interface
        if is_all && let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            for (_, ip) in interfaces
                .iter()
                .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
            {
                origins.push(format!("http://{}:{}", ip, port));
                origins.push(format!("http://{}:{}", ip, dev_port));
            }
        }

        Self { origins }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create CORS layer
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.as_header_values()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
        ])
        .allow_credentials(true)
}

/// JSON 404 for unmatched routes
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "[404] No route");
    ApiError::not_found("ROUTE_NOT_FOUND", format!("No route for {}", req.uri().path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_origins() {
        let allowed = AllowedOrigins::new("127.0.0.1", 5490);
        assert!(allowed.is_allowed("http://localhost:5490"));
        assert!(allowed.is_allowed("http://127.0.0.1:5491"));
        assert!(!allowed.is_allowed("http://evil.example:5490"));
    }

    #[test]
    fn test_custom_host_origin() {
        let allowed = AllowedOrigins::new("bench.internal", 8080);
        assert!(allowed.is_allowed("http://bench.internal:8080"));
        assert!(!allowed.is_allowed("http://localhost:8080"));
    }
}
