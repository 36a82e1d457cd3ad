use crate::errors::{ErrorKind, Result};
use crate::host::{ensure_dir, Host};
use log::info;
use std::path::{Path, PathBuf};

/// 切换根目录后必须存在的挂载点
pub const MOUNT_POINTS: [&str; 3] = ["/proc", "/sys", "/dev"];

pub const DIR_MODE: u32 = 0o755;

/// 将进程根目录切换到 `rootfs`，工作目录随之切到新的 `/`
///
/// 切换不可回滚；之后的所有路径都相对于新根目录解析。
pub fn switch_root<H: Host + ?Sized>(host: &mut H, rootfs: &Path) -> Result<()> {
    let fail = |source| ErrorKind::RootSwitchFailed {
        target: rootfs.to_path_buf(),
        source,
    };

    host.chroot(rootfs).map_err(fail)?;
    host.chdir(Path::new("/")).map_err(fail)?;

    for dir in MOUNT_POINTS {
        ensure_dir(host, Path::new(dir), DIR_MODE).map_err(|source| {
            ErrorKind::RootSwitchFailed {
                target: PathBuf::from(dir),
                source,
            }
        })?;
    }

    info!("已切换根目录到: {}", rootfs.display());
    Ok(())
}
