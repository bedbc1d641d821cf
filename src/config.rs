use std::env;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::assignment::AssignmentPolicy;
use crate::domain::checkout::CheckoutPolicy;
use crate::domain::payment::PayuCredentials;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Gateway settings. Only present when both secrets are configured.
#[derive(Debug, Clone)]
pub struct PayuSettings {
    pub credentials: PayuCredentials,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public URL the payment gateway redirects back to.
    pub app_url: String,
    pub checkout: CheckoutPolicy,
    pub assignment_policy: AssignmentPolicy,
    pub payu: Option<PayuSettings>,
}

fn parse<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse("PORT", get("PORT"), 8080u16)?;
        let app_url = get("APP_URL").unwrap_or_else(|| format!("http://{}:{}", host, port));

        let defaults = CheckoutPolicy::default();
        let checkout = CheckoutPolicy {
            delivery_fee: parse("DELIVERY_FEE", get("DELIVERY_FEE"), defaults.delivery_fee)?,
            phone_digits: parse("PHONE_DIGITS", get("PHONE_DIGITS"), defaults.phone_digits)?,
        };
        if checkout.delivery_fee < BigDecimal::from(0) {
            return Err(ConfigError::Invalid {
                name: "DELIVERY_FEE",
                reason: "must not be negative".to_string(),
            });
        }

        let assignment_policy = parse(
            "ASSIGNMENT_POLICY",
            get("ASSIGNMENT_POLICY"),
            AssignmentPolicy::RoundRobin,
        )?;

        // Secrets never fall back to built-in values.
        let payu = match (get("PAYU_MERCHANT_KEY"), get("PAYU_SALT")) {
            (Some(merchant_key), Some(salt)) => Some(PayuSettings {
                credentials: PayuCredentials { merchant_key, salt },
                base_url: get("PAYU_BASE_URL")
                    .unwrap_or_else(|| "https://test.payu.in/_payment".to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("PAYU_SALT")),
            (None, Some(_)) => return Err(ConfigError::Missing("PAYU_MERCHANT_KEY")),
        };

        Ok(Self {
            database_url,
            host,
            port,
            app_url,
            checkout,
            assignment_policy,
            payu,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/db")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.checkout.delivery_fee, BigDecimal::from(20));
        assert_eq!(cfg.checkout.phone_digits, 10);
        assert_eq!(cfg.assignment_policy, AssignmentPolicy::RoundRobin);
        assert_eq!(cfg.app_url, "http://0.0.0.0:8080");
        assert!(cfg.payu.is_none());
    }

    #[test]
    fn half_configured_gateway_is_rejected() {
        let err = config(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("PAYU_MERCHANT_KEY", "key"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PAYU_SALT")));
    }

    #[test]
    fn bad_values_are_reported() {
        let err = config(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("ASSIGNMENT_POLICY", "random"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "ASSIGNMENT_POLICY",
                ..
            }
        ));
    }
}
