use crate::error::{IdentifyError, Result};
use crate::remote::Locale;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const API_KEY_ENV: &str = "WISHLIST_IDENTIFY_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    /// 未設定の場合はリモート識別を行わない
    pub country_code: Option<String>,
    pub currency_code: String,
    pub language_code: String,
    pub max_image_size: u32,
    pub timeout_seconds: u64,
    /// スキップボタンを出すまでの秒数
    pub skip_after_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.wishlist.example/v1/identify".into(),
            api_key: None,
            country_code: None,
            currency_code: "USD".into(),
            language_code: "en".into(),
            max_image_size: 1024,
            timeout_seconds: 30,
            skip_after_seconds: 5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| IdentifyError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("wishlist-identify").join("config.json"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(IdentifyError::MissingApiKey)
    }

    /// 位置情報・通貨・言語
    pub fn locale(&self) -> Locale {
        Locale {
            country_code: self
                .country_code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_uppercase),
            currency_code: self.currency_code.clone(),
            language_code: self.language_code.clone(),
        }
    }

    pub fn set_country(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(IdentifyError::Config(format!(
                "国コードは2文字で指定してください: {}",
                code
            )));
        }
        self.country_code = Some(code.to_uppercase());
        Ok(())
    }

    pub fn set_currency(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(IdentifyError::Config(format!(
                "通貨コードは3文字で指定してください: {}",
                code
            )));
        }
        self.currency_code = code.to_uppercase();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_without_country() {
        let config = Config::default();
        assert!(config.locale().country_code.is_none());
        assert_eq!(config.locale().currency_code, "USD");
    }

    #[test]
    fn test_locale_blank_country_is_missing() {
        let config = Config {
            country_code: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.locale().country_code.is_none());
    }

    #[test]
    fn test_set_country_validates() {
        let mut config = Config::default();
        assert!(config.set_country("jp").is_ok());
        assert_eq!(config.locale().country_code.as_deref(), Some("JP"));
        assert!(matches!(config.set_country("JPN"), Err(IdentifyError::Config(_))));
    }

    #[test]
    fn test_set_currency_validates() {
        let mut config = Config::default();
        assert!(config.set_currency("eur").is_ok());
        assert_eq!(config.currency_code, "EUR");
        assert!(config.set_currency("E1").is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"country_code": "DE"}"#).unwrap();
        assert_eq!(config.country_code.as_deref(), Some("DE"));
        assert_eq!(config.timeout_seconds, 30);
    }
}
