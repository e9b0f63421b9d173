use clap::Parser;
use std::path::{Path, PathBuf};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "engine")]
#[command(about = "TOML驱动的软件光栅化引擎")]
pub struct SimpleCli {
    /// 场景文件（TOML格式），依次渲染
    #[arg(value_name = "SCENE", required = true)]
    pub scenes: Vec<PathBuf>,

    /// 输出目录，默认与场景文件同目录
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// 图像格式（文件扩展名）
    #[arg(short, long, default_value = "bmp")]
    pub format: String,

    /// 随机种子，覆盖场景文件中的 seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// 同时保存深度图（仅Z-缓冲模式）
    #[arg(long)]
    pub save_depth: bool,

    /// 禁用多线程
    #[arg(long)]
    pub single_thread: bool,
}

impl SimpleCli {
    /// 场景对应的输出目录
    pub fn output_dir_for(&self, scene: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => scene.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }
}
