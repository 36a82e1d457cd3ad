use crate::errors::ErrorKind;
use crate::host::Host;
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};

/// (链接指向, 链接路径)
pub const COMPAT_LINKS: [(&str, &str); 6] = [
    // 部分发行版的 /etc/mtab 是普通文件
    ("/proc/mounts", "/etc/mtab"),
    ("/proc/self/fd", "/dev/fd"),
    ("/proc/self/fd/0", "/dev/stdin"),
    ("/proc/self/fd/1", "/dev/stdout"),
    ("/proc/self/fd/2", "/dev/stderr"),
    // 没有真实控制台的环境
    ("/dev/null", "/dev/tty0"),
];

fn replace_link<H: Host + ?Sized>(host: &mut H, target: &Path, link: &Path) -> io::Result<()> {
    match host.remove(link) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    host.symlink(target, link)
}

/// 修复常见 rootfs 镜像中的兼容性问题，已存在的链接会被覆盖
pub fn fix_compat<H: Host + ?Sized>(host: &mut H) -> Vec<ErrorKind> {
    let mut warnings = Vec::new();

    for (target, link) in COMPAT_LINKS.iter() {
        match replace_link(host, Path::new(target), Path::new(link)) {
            Ok(()) => info!("创建链接 {} -> {}", link, target),
            Err(source) => {
                warn!("创建链接 {} 失败，但继续执行: {}", link, source);
                warnings.push(ErrorKind::SymlinkFixFailed {
                    path: PathBuf::from(link),
                    source,
                });
            }
        }
    }

    warnings
}
