/// 脚本运行时配置

use serde::{Deserialize, Serialize};
use super::{ConfigResult, ConfigError};

/// 脚本运行时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptingConfig {
    /// QuickJS 堆内存上限 (字节)
    pub memory_limit: usize,

    /// QuickJS 栈大小上限 (字节)
    pub max_stack_size: usize,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            memory_limit: 64 * 1024 * 1024,
            max_stack_size: 1024 * 1024,
        }
    }
}

impl ScriptingConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.memory_limit < 1024 * 1024 {
            return Err(ConfigError::ValidationError("Script memory limit below 1 MiB".to_string()));
        }
        if self.max_stack_size < 64 * 1024 {
            return Err(ConfigError::ValidationError("Script stack size below 64 KiB".to_string()));
        }
        Ok(())
    }
}
