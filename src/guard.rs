use crate::host::Host;
use log::{debug, info, warn};
use std::path::Path;

/// sysfs 挂载点，切换根目录之后检查
pub const SYSFS_DIR: &str = "/sys";
/// sysfs 中存在该条目即认为根目录已经初始化过
pub const SENTINEL: &str = "kernel";

/// 以 exec,suid,dev 重新挂载宿主数据分区
///
/// 必须在切换根目录之前执行，无论容器是否已经初始化。
/// 目录不存在时跳过，重新挂载失败只记录警告。
pub fn remount_data_partition<H: Host + ?Sized>(host: &mut H, data_dir: Option<&Path>) {
    let dir = match data_dir {
        Some(dir) => dir,
        None => return,
    };

    if host.open_dir(dir).is_err() {
        debug!("数据分区 {} 不存在，跳过重新挂载", dir.display());
        return;
    }

    match host.remount_permissive(dir) {
        Ok(()) => info!("已重新挂载数据分区: {}", dir.display()),
        Err(e) => warn!("重新挂载数据分区 {} 失败，但继续执行: {}", dir.display(), e),
    }
}

/// 检查 sysfs 中的标记条目
///
/// sysfs 目录无法打开时视为尚未初始化。
pub fn already_bootstrapped<H: Host + ?Sized>(host: &H) -> bool {
    match host.list_dir(Path::new(SYSFS_DIR)) {
        Ok(entries) => entries.iter().any(|name| name == SENTINEL),
        Err(e) => {
            debug!("无法读取 {}: {}，视为尚未初始化", SYSFS_DIR, e);
            false
        }
    }
}
