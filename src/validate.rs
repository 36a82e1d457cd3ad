use crate::errors::{ErrorKind, Result};
use crate::host::Host;
use caps::Capability;
use log::{debug, info};
use std::path::{Component, Path, PathBuf};

/// 动态链接器预加载变量，非空时拒绝运行
pub const PRELOAD_ENV: &str = "LD_PRELOAD";

/// 挂载、chroot、创建设备节点和修正属主所需的 capability
pub const REQUIRED_CAPS: [Capability; 5] = [
    Capability::CAP_SYS_ADMIN,
    Capability::CAP_SYS_CHROOT,
    Capability::CAP_MKNOD,
    Capability::CAP_CHOWN,
    Capability::CAP_FOWNER,
];

/// 只由根目录组成的路径，如 `/`、`//`、`/./`
fn is_lexical_root(path: &Path) -> bool {
    path.has_root()
        && path
            .components()
            .all(|c| matches!(c, Component::RootDir | Component::CurDir))
}

/// 在任何特权操作之前检查启动条件，返回通过检查的容器根目录
pub fn validate<H: Host + ?Sized>(host: &H, target: Option<&str>) -> Result<PathBuf> {
    // 验证容器目录已设置
    let target = match target {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ErrorKind::MissingTarget),
    };

    // 拒绝使用宿主根目录
    let path = PathBuf::from(target);
    if is_lexical_root(&path) {
        return Err(ErrorKind::ForbiddenRoot(target.to_string()));
    }

    check_privilege(host)?;
    check_environment(host)?;

    // 验证容器目录存在且可以打开
    host.open_dir(&path)
        .map_err(|source| ErrorKind::TargetNotFound {
            path: path.clone(),
            source,
        })?;
    let resolved = host
        .canonicalize(&path)
        .map_err(|source| ErrorKind::TargetNotFound {
            path: path.clone(),
            source,
        })?;
    if is_lexical_root(&resolved) {
        return Err(ErrorKind::ForbiddenRoot(format!(
            "{} -> {}",
            target,
            resolved.display()
        )));
    }

    info!("容器目录验证通过: {}", resolved.display());
    Ok(resolved)
}

fn check_privilege<H: Host + ?Sized>(host: &H) -> Result<()> {
    let uid = host.effective_uid();
    if uid != 0 {
        return Err(ErrorKind::InsufficientPrivilege(format!(
            "必须以 root 权限运行 (euid={})",
            uid
        )));
    }

    // capability 读取失败时按权限不足处理
    let effective = host
        .effective_capabilities()
        .map_err(|e| ErrorKind::InsufficientPrivilege(format!("无法读取 capability: {}", e)))?;
    let missing: Vec<String> = REQUIRED_CAPS
        .iter()
        .filter(|cap| !effective.contains(*cap))
        .map(|cap| cap.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ErrorKind::InsufficientPrivilege(format!(
            "缺少 capability: {}",
            missing.join(", ")
        )));
    }

    debug!("特权检查通过");
    Ok(())
}

fn check_environment<H: Host + ?Sized>(host: &H) -> Result<()> {
    match host.env_var(PRELOAD_ENV) {
        Some(value) if !value.is_empty() => {
            Err(ErrorKind::UnsafeEnvironment(PRELOAD_ENV.to_string()))
        }
        _ => Ok(()),
    }
}
