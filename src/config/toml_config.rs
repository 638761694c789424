use crate::domain::model::{AdFormat, PlacementConfig};
use crate::utils::error::{CacherError, Result};
use crate::utils::validation::{validate_range, validate_unique, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 30;
pub const MAX_REFRESH_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacherFileConfig {
    pub cacher: CacherSection,
    #[serde(default)]
    pub placements: Vec<PlacementEntry>,
    pub simulation: Option<SimulationConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacherSection {
    pub refresh_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementEntry {
    pub format: AdFormat,
    pub placement_id: String,
    pub target_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub load_latency_ms: Option<u64>,
    pub fail_every: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_format: Option<String>,
}

impl CacherFileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${AD_UNIT_ID})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_range(
            "cacher.refresh_interval_seconds",
            self.refresh_interval_seconds(),
            1,
            MAX_REFRESH_INTERVAL_SECONDS,
        )?;

        if self.placements.is_empty() {
            return Err(CacherError::ConfigValidationError {
                field: "placements".to_string(),
                message: "At least one [[placements]] entry is required".to_string(),
            });
        }

        for placement in self.placement_configs() {
            placement.validate()?;
        }

        validate_unique(
            "placements.placement_id",
            self.placements.iter().map(|p| p.placement_id.as_str()),
        )?;

        if let Some(format) = self
            .monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
        {
            if !["compact", "json"].contains(&format) {
                return Err(CacherError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Supported formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn refresh_interval_seconds(&self) -> u64 {
        self.cacher
            .refresh_interval_seconds
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECONDS)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds())
    }

    pub fn placement_configs(&self) -> Vec<PlacementConfig> {
        self.placements
            .iter()
            .map(|p| PlacementConfig::new(p.format, p.placement_id.clone(), p.target_count))
            .collect()
    }

    /// 模擬廣告網路延遲
    pub fn load_latency(&self) -> Duration {
        let ms = self
            .simulation
            .as_ref()
            .and_then(|s| s.load_latency_ms)
            .unwrap_or(250);
        Duration::from_millis(ms)
    }

    pub fn fail_every(&self) -> u64 {
        self.simulation
            .as_ref()
            .and_then(|s| s.fail_every)
            .unwrap_or(0)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            == Some("json")
    }
}

impl Validate for CacherFileConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[cacher]
refresh_interval_seconds = 15

[[placements]]
format = "interstitial"
placement_id = "unit1"
target_count = 2

[[placements]]
format = "app_open"
placement_id = "open"
target_count = 1

[simulation]
load_latency_ms = 10
fail_every = 4
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = CacherFileConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.refresh_interval(), Duration::from_secs(15));
        assert_eq!(
            config.placement_configs(),
            vec![
                PlacementConfig::new(AdFormat::Interstitial, "unit1", 2),
                PlacementConfig::new(AdFormat::AppOpen, "open", 1),
            ]
        );
        assert_eq!(config.load_latency(), Duration::from_millis(10));
        assert_eq!(config.fail_every(), 4);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = CacherFileConfig::from_toml_str(
            r#"
[cacher]

[[placements]]
format = "rewarded"
placement_id = "r1"
target_count = 1
"#,
        )
        .unwrap();

        assert_eq!(
            config.refresh_interval_seconds(),
            DEFAULT_REFRESH_INTERVAL_SECONDS
        );
        assert_eq!(config.fail_every(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AD_CACHER_TEST_UNIT", "ca-app-pub-3940256099942544/4411468910");

        let config = CacherFileConfig::from_toml_str(
            r#"
[cacher]
refresh_interval_seconds = 5

[[placements]]
format = "interstitial"
placement_id = "${AD_CACHER_TEST_UNIT}"
target_count = 1
"#,
        )
        .unwrap();
        assert_eq!(
            config.placements[0].placement_id,
            "ca-app-pub-3940256099942544/4411468910"
        );

        std::env::remove_var("AD_CACHER_TEST_UNIT");
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = CacherFileConfig::from_toml_str(
            r#"
[cacher]

[[placements]]
format = "banner"
placement_id = "b1"
target_count = 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CacherError::TomlError(_)));
    }

    #[test]
    fn test_config_validation() {
        let zero_interval = BASIC.replace("refresh_interval_seconds = 15", "refresh_interval_seconds = 0");
        let config = CacherFileConfig::from_toml_str(&zero_interval).unwrap();
        assert!(config.validate().is_err());

        let huge_interval = BASIC.replace(
            "refresh_interval_seconds = 15",
            "refresh_interval_seconds = 9223372036854775807",
        );
        let config = CacherFileConfig::from_toml_str(&huge_interval).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CacherError::InvalidConfigValueError { .. })
        ));

        let one_day = BASIC.replace("refresh_interval_seconds = 15", "refresh_interval_seconds = 86400");
        let config = CacherFileConfig::from_toml_str(&one_day).unwrap();
        assert!(config.validate().is_ok());

        let duplicate = BASIC.replace("placement_id = \"open\"", "placement_id = \"unit1\"");
        let config = CacherFileConfig::from_toml_str(&duplicate).unwrap();
        assert!(config.validate().is_err());

        let zero_target = BASIC.replace("target_count = 2", "target_count = 0");
        let config = CacherFileConfig::from_toml_str(&zero_target).unwrap();
        assert!(config.validate().is_err());

        let no_placements = CacherFileConfig::from_toml_str("[cacher]\n").unwrap();
        assert!(matches!(
            no_placements.validate(),
            Err(CacherError::ConfigValidationError { .. })
        ));

        let bad_logs = format!("{}\n[monitoring]\nlog_format = \"xml\"\n", BASIC);
        let config = CacherFileConfig::from_toml_str(&bad_logs).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = CacherFileConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.placements.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = CacherFileConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, CacherError::IoError(_)));
    }
}
