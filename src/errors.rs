use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 启动流程中可能失败的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    RootSwitch,
    Mount,
    Devices,
    ProtectPaths,
    Symlinks,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::RootSwitch => "root-switch",
            Stage::Mount => "mount",
            Stage::Devices => "devices",
            Stage::ProtectPaths => "protect-paths",
            Stage::Symlinks => "symlinks",
            Stage::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("container root directory is not set")]
    MissingTarget,

    #[error("refusing to use the host root as container root: {0}")]
    ForbiddenRoot(String),

    #[error("insufficient privilege: {0}")]
    InsufficientPrivilege(String),

    #[error("unsafe environment: {0} must be unset or empty")]
    UnsafeEnvironment(String),

    #[error("container root directory not found: {}: {source}", .path.display())]
    TargetNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to switch root to {}: {source}", .target.display())]
    RootSwitchFailed {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mount stage {stage} failed at {}: {source}", .target.display())]
    MountFailed {
        stage: &'static str,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("device node {}: {source}", .path.display())]
    DeviceNodeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read-only bind of {}: {source}", .path.display())]
    BindProtectFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compatibility symlink {}: {source}", .path.display())]
    SymlinkFixFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Capabilities error: {0}")]
    Capabilities(#[from] caps::errors::CapsError),
}

impl ErrorKind {
    /// 设备、只读绑定和兼容链接的失败只记录警告，不终止启动
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ErrorKind::DeviceNodeFailed { .. }
                | ErrorKind::BindProtectFailed { .. }
                | ErrorKind::SymlinkFixFailed { .. }
        )
    }

    /// 出错的阶段，供致命错误信息使用
    pub fn stage(&self) -> Stage {
        match self {
            ErrorKind::MissingTarget
            | ErrorKind::ForbiddenRoot(_)
            | ErrorKind::InsufficientPrivilege(_)
            | ErrorKind::UnsafeEnvironment(_)
            | ErrorKind::TargetNotFound { .. }
            | ErrorKind::Capabilities(_) => Stage::Validate,
            ErrorKind::RootSwitchFailed { .. } => Stage::RootSwitch,
            ErrorKind::MountFailed { .. } => Stage::Mount,
            ErrorKind::DeviceNodeFailed { .. } => Stage::Devices,
            ErrorKind::BindProtectFailed { .. } => Stage::ProtectPaths,
            ErrorKind::SymlinkFixFailed { .. } => Stage::Symlinks,
            ErrorKind::InvalidConfig(_) | ErrorKind::Io(_) | ErrorKind::SerdeJson(_) => {
                Stage::Config
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
