//! Engine configuration.
//!
//! Every value has a default; `from_env` overrides from `STORECRAFT_*` variables and
//! falls back (with a warning) on anything it cannot parse.

use std::str::FromStr;
use std::time::Duration;

use storecraft_core::Money;
use storecraft_sales::PricingRules;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Available quantity at or below which a low-stock alert fires.
    pub low_stock_threshold: i64,
    pub tax_rate_bps: u32,
    pub shipping_fee: Money,
    pub free_shipping_threshold: Option<Money>,
    /// Used when the tenant's store config does not set one.
    pub default_order_prefix: String,
    pub action_timeout: Duration,
    /// Compare-and-swap attempts before a stock write gives up with `Conflict`.
    pub cas_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            tax_rate_bps: 0,
            shipping_fee: Money::ZERO,
            free_shipping_threshold: None,
            default_order_prefix: "ORD".to_string(),
            action_timeout: Duration::from_secs(10),
            cas_retries: 8,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            low_stock_threshold: parse_or(
                &lookup,
                "STORECRAFT_LOW_STOCK_THRESHOLD",
                defaults.low_stock_threshold,
            ),
            tax_rate_bps: parse_or(&lookup, "STORECRAFT_TAX_RATE_BPS", defaults.tax_rate_bps),
            shipping_fee: Money::from_major(parse_or(
                &lookup,
                "STORECRAFT_SHIPPING_FEE",
                defaults.shipping_fee.to_major(),
            )),
            free_shipping_threshold: lookup("STORECRAFT_FREE_SHIPPING_THRESHOLD")
                .and_then(|raw| parse_value::<f64>("STORECRAFT_FREE_SHIPPING_THRESHOLD", &raw))
                .map(Money::from_major),
            default_order_prefix: lookup("STORECRAFT_ORDER_PREFIX")
                .map(|p| p.trim().to_ascii_uppercase())
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.default_order_prefix),
            action_timeout: Duration::from_millis(parse_or(
                &lookup,
                "STORECRAFT_ACTION_TIMEOUT_MS",
                defaults.action_timeout.as_millis() as u64,
            )),
            cas_retries: parse_or(&lookup, "STORECRAFT_CAS_RETRIES", defaults.cas_retries).max(1),
        }
    }

    pub fn pricing_rules(&self) -> PricingRules {
        PricingRules {
            tax_rate_bps: self.tax_rate_bps,
            shipping_fee: self.shipping_fee,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring unparsable configuration value");
            None
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|raw| parse_value(key, &raw))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(EngineConfig::from_lookup(|_| None), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("STORECRAFT_LOW_STOCK_THRESHOLD", "10"),
            ("STORECRAFT_TAX_RATE_BPS", "1800"),
            ("STORECRAFT_SHIPPING_FEE", "49.5"),
            ("STORECRAFT_FREE_SHIPPING_THRESHOLD", "999"),
            ("STORECRAFT_ORDER_PREFIX", " shop "),
            ("STORECRAFT_ACTION_TIMEOUT_MS", "2500"),
        ]));
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(config.tax_rate_bps, 1800);
        assert_eq!(config.shipping_fee, Money::from_minor(4950));
        assert_eq!(config.free_shipping_threshold, Some(Money::from_minor(99_900)));
        assert_eq!(config.default_order_prefix, "SHOP");
        assert_eq!(config.action_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("STORECRAFT_TAX_RATE_BPS", "eighteen"),
            ("STORECRAFT_CAS_RETRIES", "0"),
        ]));
        assert_eq!(config.tax_rate_bps, 0);
        assert_eq!(config.cas_retries, 1);
    }
}
