//! Engine settings file.
//!
//! ```yaml
//! engine:
//!   max_steps: 30
//!   delay_policy: skip
//!   ai_fallback_message: "Un asesor te responderá pronto"
//! ```
//!
//! Missing keys keep the [`DriverConfig`] defaults. `CONVOFLOW_*`
//! environment variables override the file.

use anyhow::{bail, Context, Result};
use convoflow_runtime::{DelayPolicy, DriverConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ENV_MAX_STEPS: &str = "CONVOFLOW_MAX_STEPS";
pub const ENV_WEBHOOK_TIMEOUT_MS: &str = "CONVOFLOW_WEBHOOK_TIMEOUT_MS";
pub const ENV_AI_TIMEOUT_MS: &str = "CONVOFLOW_AI_TIMEOUT_MS";
pub const ENV_DELAY_POLICY: &str = "CONVOFLOW_DELAY_POLICY";
pub const ENV_MAX_DELAY_SECONDS: &str = "CONVOFLOW_MAX_DELAY_SECONDS";
pub const ENV_AI_FALLBACK_MESSAGE: &str = "CONVOFLOW_AI_FALLBACK_MESSAGE";

/// 单个 delay 节点允许的最长等待（秒）
pub const MAX_DELAY_SECONDS_LIMIT: f64 = 3600.0;

/// 引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub engine: DriverConfig,
}

impl EngineSettings {
    /// 从 YAML 字符串加载配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content)
            .with_context(|| "Failed to parse YAML engine settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从 JSON 字符串加载配置
    pub fn from_json_str(content: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(content)
            .with_context(|| "Failed to parse JSON engine settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从文件加载配置，`.json` 按 JSON 解析，其余按 YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| {
            format!("Failed to read settings file: {:?}", path)
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };
        parsed.with_context(|| format!("Invalid settings file: {:?}", path))
    }

    /// File (when given) plus process environment overrides.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(std::env::vars())?;
        Ok(settings)
    }

    /// Applies `CONVOFLOW_*` pairs from `vars`; other keys are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let engine = &mut self.engine;
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                ENV_MAX_STEPS => engine.max_steps = parse_env(key, value)?,
                ENV_WEBHOOK_TIMEOUT_MS => {
                    engine.default_webhook_timeout_ms = parse_env(key, value)?
                }
                ENV_AI_TIMEOUT_MS => engine.ai_timeout_ms = parse_env(key, value)?,
                ENV_MAX_DELAY_SECONDS => {
                    engine.max_delay_seconds = parse_env(key, value)?
                }
                ENV_DELAY_POLICY => {
                    engine.delay_policy = match value.to_ascii_lowercase().as_str() {
                        "sleep" => DelayPolicy::Sleep,
                        "skip" => DelayPolicy::Skip,
                        other => bail!("{} must be sleep or skip, got {:?}", key, other),
                    }
                }
                ENV_AI_FALLBACK_MESSAGE => {
                    engine.ai_fallback_message =
                        (!value.is_empty()).then(|| value.to_string())
                }
                _ => continue,
            }
            tracing::debug!(key, "engine setting overridden from environment");
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.max_steps == 0 {
            bail!("engine.max_steps must be at least 1");
        }
        if !(0.0..=MAX_DELAY_SECONDS_LIMIT).contains(&engine.max_delay_seconds) {
            bail!(
                "engine.max_delay_seconds must be between 0 and {}, got {}",
                MAX_DELAY_SECONDS_LIMIT,
                engine.max_delay_seconds
            );
        }
        Ok(())
    }

    pub fn driver_config(&self) -> DriverConfig {
        self.engine.clone()
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}
