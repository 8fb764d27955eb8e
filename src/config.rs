//! Relay configuration, loaded from a YAML file: which address the RTSP
//! server listens on, and which named streams to dial on startup and
//! serve under. Unknown keys are rejected rather than silently ignored —
//! a typo'd stream name is a deploy-time mistake worth catching.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_rtsp_listen() -> String {
    "0.0.0.0:8554".to_owned()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default = "default_rtsp_listen")]
    pub rtsp_listen: String,

    /// Stream name -> source URL (`rtsp://`, `rtmp://`, or a local test
    /// fixture scheme). Dialed once at startup and kept alive for the
    /// relay's lifetime; see `src/bin/mediarelay.rs`.
    #[serde(default)]
    pub streams: HashMap<String, String>,
}

impl Default for RelayConfig {
    fn default() -> RelayConfig {
        RelayConfig {
            rtsp_listen: default_rtsp_listen(),
            streams: HashMap::new(),
        }
    }
}

impl RelayConfig {
    pub fn from_yaml(raw: &str) -> Result<RelayConfig> {
        if raw.trim().is_empty() {
            return Ok(RelayConfig::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::InvalidSdp(format!("invalid config: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<RelayConfig> {
        let raw = std::fs::read_to_string(path)?;
        RelayConfig::from_yaml(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = RelayConfig::from_yaml("").unwrap();
        assert_eq!(config.rtsp_listen, "0.0.0.0:8554");
        assert!(config.streams.is_empty());
    }

    #[test]
    fn parses_streams_map() {
        let config = RelayConfig::from_yaml(
            "rtsp_listen: 127.0.0.1:8554\nstreams:\n  cam1: rtsp://192.168.1.10/stream\n",
        )
        .unwrap();
        assert_eq!(config.rtsp_listen, "127.0.0.1:8554");
        assert_eq!(
            config.streams.get("cam1").map(String::as_str),
            Some("rtsp://192.168.1.10/stream")
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = RelayConfig::from_yaml("bogus: true").unwrap_err();
        assert!(matches!(err, Error::InvalidSdp(_)));
    }
}
