use anyhow::{Context, Result};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tracing::warn;

/// Read the peer list: one address per line, blank lines and `#` comments
/// skipped. A line without a port gets `default_port`. A missing file is an
/// empty peer set.
pub fn load_peers<P: AsRef<Path>>(path: P, default_port: u16) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "no peers file found");
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_peers(&contents, default_port))
}

pub fn parse_peers(contents: &str, default_port: u16) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| with_port(line, default_port))
        .collect()
}

fn with_port(addr: &str, default_port: u16) -> String {
    if addr.parse::<SocketAddr>().is_ok() {
        return addr.to_string();
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            addr.to_string()
        }
        _ if addr.contains(':') && !addr.starts_with('[') => format!("[{addr}]:{default_port}"),
        _ => format!("{addr}:{default_port}"),
    }
}
