use crate::bundler::BundlerClient;
use crate::error::{Error, Result};
use crate::gas::{BaseFeeSource, Eip1559GasPricing, PimlicoGasPricing, PimlicoTier};
use crate::paymaster::PaymasterClient;
use serde::Deserialize;
use serde_json::Value;
use std::{env, fs, path::Path};

/// Which gas-pricing strategy the bundler needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Vendor {
    Pimlico,
    Alchemy,
    #[default]
    Standard,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymasterConfig {
    pub url: String,
    /// Passed through as the ERC-7677 context object.
    #[serde(default)]
    pub context: Option<Value>,
}

/// Bundler (and optional paymaster) settings, read from a camelCase JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerConfig {
    pub chain_id: u64,
    pub bundler_url: String,
    /// If set and present in the environment, replaces `bundlerUrl`.
    #[serde(default)]
    pub bundler_url_env_var: Option<String>,
    #[serde(default)]
    pub vendor: Vendor,
    #[serde(default)]
    pub skip_gas_estimation: bool,
    #[serde(default = "default_multiplier_bps")]
    pub base_fee_multiplier_bps: u64,
    /// Defaults to the vendor's own source when unset.
    #[serde(default)]
    pub base_fee_source: Option<BaseFeeSource>,
    #[serde(default)]
    pub pimlico_tier: PimlicoTier,
    #[serde(default)]
    pub paymaster: Option<PaymasterConfig>,
}

fn default_multiplier_bps() -> u64 {
    10_000
}

impl BundlerConfig {
    pub fn bundler(&self) -> BundlerClient {
        match self.vendor {
            Vendor::Pimlico => BundlerClient::new(
                self.chain_id,
                &self.bundler_url,
                PimlicoGasPricing::new()
                    .with_tier(self.pimlico_tier)
                    .with_multiplier_bps(self.base_fee_multiplier_bps)
                    .with_skip_estimation(self.skip_gas_estimation),
            ),
            Vendor::Alchemy | Vendor::Standard => {
                let mut pricing = if self.vendor == Vendor::Alchemy {
                    Eip1559GasPricing::alchemy()
                } else {
                    Eip1559GasPricing::standard()
                };
                if let Some(source) = self.base_fee_source {
                    pricing = pricing.with_base_fee_source(source);
                }
                BundlerClient::new(
                    self.chain_id,
                    &self.bundler_url,
                    pricing
                        .with_multiplier_bps(self.base_fee_multiplier_bps)
                        .with_skip_estimation(self.skip_gas_estimation),
                )
            }
        }
    }

    pub fn paymaster(&self) -> Option<PaymasterClient> {
        self.paymaster.as_ref().map(|pm| {
            let client = PaymasterClient::new(&pm.url, self.chain_id);
            match &pm.context {
                Some(ctx) => client.with_context(ctx.clone()),
                None => client,
            }
        })
    }
}

/// Read a [`BundlerConfig`] from `path`.
///
/// The bundler URL comes from `url_override`, then the variable named by
/// `bundlerUrlEnvVar`, then the file.
pub fn load_config(path: &Path, url_override: Option<String>) -> Result<BundlerConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: BundlerConfig = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    if let Some(url) = url_override {
        cfg.bundler_url = url;
    } else if let Some(url) = cfg.bundler_url_env_var.as_deref().and_then(|v| env::var(v).ok()) {
        cfg.bundler_url = url;
    }

    if cfg.bundler_url.trim().is_empty() {
        return Err(Error::Config("bundlerUrl is empty".into()));
    }
    if cfg.base_fee_multiplier_bps == 0 {
        return Err(Error::Config("baseFeeMultiplierBps must be positive".into()));
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Bundler;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let f = write_config(r#"{ "chainId": 11155111, "bundlerUrl": "http://localhost:4337" }"#);
        let cfg = load_config(f.path(), None).unwrap();
        assert_eq!(cfg.vendor, Vendor::Standard);
        assert_eq!(cfg.base_fee_multiplier_bps, 10_000);
        assert_eq!(cfg.base_fee_source, None);
        assert_eq!(cfg.pimlico_tier, PimlicoTier::Standard);
        assert!(!cfg.skip_gas_estimation);
        assert!(cfg.paymaster().is_none());

        let bundler = cfg.bundler();
        assert_eq!(bundler.chain_id(), 11155111);
        assert_eq!(bundler.vendor(), "standard");
    }

    #[test]
    fn full_config_builds_vendor_and_paymaster() {
        let f = write_config(
            r#"{
                "chainId": 8453,
                "bundlerUrl": "https://api.pimlico.io/v2/8453/rpc",
                "vendor": "pimlico",
                "pimlicoTier": "fast",
                "skipGasEstimation": true,
                "baseFeeMultiplierBps": 12000,
                "paymaster": {
                    "url": "https://api.pimlico.io/v2/8453/rpc",
                    "context": { "sponsorshipPolicyId": "sp_abc" }
                }
            }"#,
        );
        let cfg = load_config(f.path(), None).unwrap();
        assert_eq!(cfg.vendor, Vendor::Pimlico);
        assert_eq!(cfg.pimlico_tier, PimlicoTier::Fast);
        assert_eq!(cfg.base_fee_multiplier_bps, 12_000);
        assert_eq!(cfg.bundler().vendor(), "pimlico");
        assert!(cfg.paymaster().is_some());
    }

    #[test]
    fn base_fee_source_parses() {
        let f = write_config(
            r#"{ "chainId": 1, "bundlerUrl": "http://x", "vendor": "alchemy", "baseFeeSource": "pendingBlock" }"#,
        );
        let cfg = load_config(f.path(), None).unwrap();
        assert_eq!(cfg.base_fee_source, Some(BaseFeeSource::PendingBlock));
        assert_eq!(cfg.bundler().vendor(), "alchemy");
    }

    #[test]
    fn url_override_beats_env_and_file() {
        let var = "SENDOP_TEST_BUNDLER_URL_OVERRIDE";
        env::set_var(var, "http://from-env");
        let f = write_config(&format!(
            r#"{{ "chainId": 1, "bundlerUrl": "http://from-file", "bundlerUrlEnvVar": "{var}" }}"#
        ));

        let cfg = load_config(f.path(), Some("http://from-flag".into())).unwrap();
        assert_eq!(cfg.bundler_url, "http://from-flag");

        let cfg = load_config(f.path(), None).unwrap();
        assert_eq!(cfg.bundler_url, "http://from-env");
        env::remove_var(var);
    }

    #[test]
    fn unset_env_var_falls_back_to_file() {
        let f = write_config(
            r#"{ "chainId": 1, "bundlerUrl": "http://from-file", "bundlerUrlEnvVar": "SENDOP_TEST_UNSET_URL_VAR" }"#,
        );
        let cfg = load_config(f.path(), None).unwrap();
        assert_eq!(cfg.bundler_url, "http://from-file");
    }

    #[test]
    fn invalid_files_are_config_errors() {
        let err = load_config(Path::new("/definitely/not/here.json"), None).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("failed to read")));

        let f = write_config(r#"{ "chainId": 1 }"#);
        let err = load_config(f.path(), None).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("failed to parse")));

        let f = write_config(r#"{ "chainId": 1, "bundlerUrl": "http://x", "vendor": "stackup" }"#);
        assert!(load_config(f.path(), None).is_err());

        let f = write_config(r#"{ "chainId": 1, "bundlerUrl": "http://x", "baseFeeMultiplierBps": 0 }"#);
        let err = load_config(f.path(), None).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("baseFeeMultiplierBps")));
    }
}
