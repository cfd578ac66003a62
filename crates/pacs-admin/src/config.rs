//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值（固定版式模板）、可选的TOML文件、
//! `PACS__` 前缀的环境变量（如 `PACS__LAYOUT__PAGE_BREAK_THRESHOLD=680`）。

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use pacs_layout::{LayoutConfig, PageSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<ReportingConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 报告引擎完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// 页面模板
    pub page: PageSpec,
    /// 排版常量
    pub layout: LayoutConfig,
    /// 图像存储
    pub storage: StorageSettings,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 图像存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// 根目录
    pub root_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root_path: "./data/images".to_string(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志过滤指令（如 `info` 或 `pacs_workflow=debug,info`），`RUST_LOG` 优先
    pub level: String,
    /// 日志格式
    pub format: LogFormat,
    /// 是否输出事件目标
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            with_target: true,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&ReportingConfig) -> Result<()>,
}

impl ConfigManager {
    /// 加载配置，`config_path` 为空时只使用默认值和环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let validator = ConfigValidator::new();
        let config = Self::load_config(config_path)?;
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和进程环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<ReportingConfig> {
        Self::load_config_with_env(config_path, None)
    }

    /// `env` 为空时读取进程环境变量，否则只使用给定的变量表
    fn load_config_with_env(
        config_path: Option<&str>,
        env: Option<Map<String, String>>,
    ) -> Result<ReportingConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("PACS")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: ReportingConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!(
            "Configuration loaded from: {}",
            config_path.unwrap_or("<defaults>")
        );
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> ReportingConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置（先校验）
    pub async fn update_config(&self, new_config: ReportingConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config).await
    }

    /// 保存配置到文件
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config = self.config.read().await;
        let config_str =
            toml::to_string_pretty(&*config).context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    /// 验证当前配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "page",
                validator: |config| {
                    config.page.validate()?;
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "layout.page_break_threshold",
                validator: |config| {
                    let threshold = config.layout.page_break_threshold;
                    if threshold <= config.page.margin_top || threshold > config.page.height {
                        anyhow::bail!(
                            "page break threshold {} must be within ({}, {}]",
                            threshold,
                            config.page.margin_top,
                            config.page.height
                        );
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "layout.image_grid_threshold",
                validator: |config| {
                    let threshold = config.layout.image_grid_threshold;
                    if threshold <= config.page.margin_top
                        || threshold > config.layout.page_break_threshold
                    {
                        anyhow::bail!(
                            "image grid threshold {} must be within ({}, {}]",
                            threshold,
                            config.page.margin_top,
                            config.layout.page_break_threshold
                        );
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "layout.images_per_row",
                validator: |config| {
                    if config.layout.images_per_row == 0 {
                        anyhow::bail!("images per row cannot be 0");
                    }
                    if config.layout.thumbnail_size <= 0.0 {
                        anyhow::bail!("thumbnail size must be positive");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "storage.root_path",
                validator: |config| {
                    if config.storage.root_path.trim().is_empty() {
                        anyhow::bail!("storage root path cannot be empty");
                    }
                    Ok(())
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map_err(|e| anyhow::anyhow!("{}: {:?}", e, config.logging.level))?;
                    Ok(())
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ReportingConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid configuration: {}", rule.field_path)));
            }
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
