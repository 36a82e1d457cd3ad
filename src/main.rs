use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use colored::Colorize;
use rootfs_boot::bootstrap::{EXIT_FAILURE, EXIT_SUCCESS};
use rootfs_boot::commands::bootstrap::BootstrapCommand;
use rootfs_boot::commands::Command;
use rootfs_boot::{logger, BootstrapConfig};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rootfs-boot")]
#[command(about = "将目录准备为容器根文件系统")]
#[command(version = "1.0.0")]
struct Cli {
    /// Container root directory
    rootfs: Option<String>,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the bootstrap report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    // 参数错误与其他失败使用同一个退出码
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                    process::exit(EXIT_SUCCESS)
                }
                _ => process::exit(EXIT_FAILURE),
            }
        }
    };

    let config = match cli.config {
        Some(ref path) => BootstrapConfig::load_from_file(path).unwrap_or_else(|e| {
            eprintln!("{} 读取配置文件 {} 失败: {}", "错误:".red().bold(), path.display(), e);
            process::exit(EXIT_FAILURE);
        }),
        None => BootstrapConfig::default(),
    };

    // 初始化日志
    logger::init(&config.log_level).unwrap_or_else(|e| {
        eprintln!("初始化日志失败: {}", e);
        process::exit(EXIT_FAILURE);
    });

    let cmd = BootstrapCommand::new(cli.rootfs, config, cli.json);
    if let Err(e) = cmd.execute() {
        eprintln!("{} [{}] {}", "错误:".red().bold(), e.stage(), e);
        process::exit(EXIT_FAILURE);
    }
}
