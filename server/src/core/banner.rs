//! Startup banner and URL display

use super::config::is_all_interfaces;
use super::constants::APP_NAME;

/// Label column width
const W: usize = 10;

fn cyan(text: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", text)
}

/// Where a client trades the bootstrap token for a session
fn exchange_hint(host: &str, port: u16) -> String {
    format!("POST http://{}:{}/api/auth/exchange", host, port)
}

/// Print the startup banner with URLs
pub fn print_banner(
    host: &str,
    port: u16,
    auth_enabled: bool,
    bootstrap_token: &str,
    data_dir: &str,
) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "API:",
        cyan(&format!("http://{}:{}/api", display_host, port))
    );
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "Docs:",
        cyan(&format!("http://{}:{}/api/docs", display_host, port))
    );

    if auth_enabled {
        println!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
            "Token:",
            cyan(bootstrap_token)
        );
        println!(
            "  \x1b[90m➜  {:<W$} {}\x1b[0m",
            "Sign in:",
            exchange_hint(display_host, port)
        );
    } else {
        println!(
            "  \x1b[90m➜  {:<W$} disabled, every request acts as the local user\x1b[0m",
            "Auth:"
        );
    }

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    } else if is_all_interfaces(host) {
        if let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            for (_, ip) in interfaces
                .iter()
                .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
            {
                println!(
                    "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
                    "Network:",
                    cyan(&format!("http://{}:{}/api", ip, port))
                );
            }
        }
    } else {
        println!(
            "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
            "Network:",
            cyan(&format!("http://{}:{}/api", host, port))
        );
    }
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_hint() {
        assert_eq!(
            exchange_hint("localhost", 5490),
            "POST http://localhost:5490/api/auth/exchange"
        );
    }
}
