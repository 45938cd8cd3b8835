//! Probe command implementation.

use resync_net::{AlwaysOnline, ConnectivityDiagnostics, ConnectivityProbe, ProbeConfig, ReqwestProber};
use std::sync::Arc;

/// Splits a `NAME:VALUE` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header must be NAME:VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Runs the probe command.
pub fn run(
    backend: Option<String>,
    headers: &[String],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ProbeConfig::default();
    if let Some(url) = backend {
        config = config.with_backend_url(url);
    }
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        config = config.with_backend_header(name, value);
    }

    let probe = ConnectivityProbe::new(
        config,
        Arc::new(AlwaysOnline),
        Arc::new(ReqwestProber::new()?),
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let diagnostics = runtime.block_on(probe.test_connectivity());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&diagnostics)?),
        _ => print_text_output(&diagnostics),
    }
    Ok(())
}

fn print_text_output(d: &ConnectivityDiagnostics) {
    println!("Connection quality: {}", d.quality.as_str());
    println!("  Internet reachable: {}", yes_no(d.can_reach_internet));
    println!("  Backend:            {:?}", d.backend_status);
    if let Some(latency) = d.latency_ms {
        println!("  Backend latency:    {latency} ms");
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_header("apikey: abc:def").unwrap(),
            ("apikey".to_string(), "abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(":value").is_err());
    }
}
