//! Bridge configuration

use std::time::Duration;

/// Default deadline for one RPC round trip to the extension.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Listen settings and behavior flags for the bridge process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Arm anti-detection patches for the bound tab before commands run.
    pub stealth: bool,
    pub rpc_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            stealth: true,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_extension_expectations() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5555);
        assert!(config.stealth);
    }
}
