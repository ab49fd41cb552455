//! Utility functions for replkv

use std::future::Future;
use std::time::Duration;

/// Parse duration string (e.g., "500ms", "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else {
        let split = s.len() - s.chars().last().map_or(0, char::len_utf8);
        (&s[..split], &s[split..])
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let secs = |scale: u64| {
        num.checked_mul(scale)
            .map(std::time::Duration::from_secs)
            .ok_or_else(|| crate::Error::InvalidConfig(format!("duration out of range: {}", s)))
    };

    match unit {
        "ms" => Ok(std::time::Duration::from_millis(num)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(crate::Error::InvalidConfig(format!(
            "unknown duration unit: {}",
            unit
        ))),
    }
}

/// Parse a duration string into whole milliseconds, the unit the config files use
pub fn parse_duration_ms(s: &str) -> crate::Result<u64> {
    let duration = parse_duration(s)?;
    u64::try_from(duration.as_millis())
        .map_err(|_| crate::Error::InvalidConfig(format!("duration out of range: {}", s)))
}

/// Split `host:port` into its parts
pub fn split_host_port(addr: &str) -> crate::Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| crate::Error::InvalidConfig(format!("missing port in {}", addr)))?;
    if host.is_empty() {
        return Err(crate::Error::InvalidConfig(format!("missing host in {}", addr)));
    }
    let port = port
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid port in {}", addr)))?;
    Ok((host.to_string(), port))
}

/// Split a list of `host:port` strings into parallel host and port lists
pub fn split_addrs(addrs: &[String]) -> crate::Result<(Vec<String>, Vec<u16>)> {
    let mut hosts = Vec::with_capacity(addrs.len());
    let mut ports = Vec::with_capacity(addrs.len());
    for addr in addrs {
        let (host, port) = split_host_port(addr)?;
        hosts.push(host);
        ports.push(port);
    }
    Ok((hosts, ports))
}

/// Retry with exponential backoff
///
/// `f` runs once plus up to `retries` more times while it fails with a
/// retryable error. The delay starts at `initial_delay` and doubles.
pub async fn retry_with_backoff<F, Fut, T>(
    mut f: F,
    retries: u32,
    initial_delay: Duration,
) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match f().await {
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    "Retry attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            result => return result,
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
