//! Address resolution

use std::net::IpAddr;

use tracing::trace;

/// Resolve a hostname or IP literal to the first IP address found.
///
/// IP literals are returned without a lookup.
pub async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    let ip = addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))?;

    trace!(host = %host, ip = %ip, "resolved host");
    Ok(ip)
}
