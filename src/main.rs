use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

mod core;
mod error;
mod geometry;
mod io;
mod lsystem;
mod material_system;
mod scene;

use crate::core::renderer::render;
use error::Result;
use io::image_output::save_render_output;
use io::scene_loader::SceneDescription;
use io::simple_cli::SimpleCli;

/// 资源不足时的退出码
const EXIT_INSUFFICIENT_RESOURCES: u8 = 100;

/// 渲染单个场景文件并保存结果
fn render_scene_file(cli: &SimpleCli, path: &Path) -> Result<()> {
    let start = Instant::now();
    info!("处理场景 {}", path.display());

    let mut scene = SceneDescription::load_from_file(path)?;
    if cli.single_thread {
        scene.settings.multithreading = false;
    }

    let seed = cli
        .seed
        .or(scene.settings.seed)
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());
    debug!("随机种子: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let Some(output) = render(&scene, &mut rng)? else {
        warn!("[{}] could not generate image", path.display());
        return Ok(());
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    save_render_output(
        &output,
        &cli.output_dir_for(path),
        &stem,
        &cli.format,
        cli.save_depth,
    )?;

    info!("场景 {} 完成，耗时 {:?}", path.display(), start.elapsed());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = SimpleCli::parse();

    let mut failed = false;
    let mut exhausted = false;
    for path in &cli.scenes {
        if let Err(e) = render_scene_file(&cli, path) {
            error!("场景 {} 渲染失败: {}", path.display(), e);
            if e.is_resource_exhaustion() {
                exhausted = true;
            } else {
                failed = true;
            }
        }
    }

    if exhausted {
        ExitCode::from(EXIT_INSUFFICIENT_RESOURCES)
    } else if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
