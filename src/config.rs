use crate::errors::{ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "/data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub log_level: String,
    /// 切换根目录前需要以 exec,suid,dev 重新挂载的宿主数据分区，`null` 表示跳过
    pub data_dir: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: Some(PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BootstrapConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // 验证日志级别
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            _ => {
                return Err(ErrorKind::InvalidConfig(format!(
                    "无效的日志级别: {}",
                    self.log_level
                )));
            }
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_absolute() {
                return Err(ErrorKind::InvalidConfig(format!(
                    "数据分区路径必须是绝对路径: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}
