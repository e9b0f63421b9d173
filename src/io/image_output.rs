//! # 图像输出
//!
//! 彩色图像保存为 `<stem>.<format>`，格式由扩展名决定（`image` 支持的任意编码）。
//! 深度图保存为 `<stem>_depth.png`：视点距离按百分位归一化后反转（越近越热），再映射到 JET 色带。

use crate::core::frame_buffer::FrameBuffer;
use crate::core::renderer::RenderOutput;
use crate::error::Result;
use crate::material_system::color::apply_colormap_jet;
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// 将距离缓冲归一化到 [min_percentile, max_percentile] 百分位范围，非有限值保持不变
pub fn normalize_depth(distances: &[f64], min_percentile: f64, max_percentile: f64) -> Vec<f64> {
    let mut finite: Vec<f64> = distances.iter().copied().filter(|d| d.is_finite()).collect();
    if finite.is_empty() {
        return distances.to_vec();
    }
    finite.sort_unstable_by(f64::total_cmp);

    let last = finite.len() - 1;
    let index = |percentile: f64| ((percentile / 100.0 * last as f64).round() as usize).min(last);
    let mut min_clip = finite[index(min_percentile)];
    let mut max_clip = finite[index(max_percentile)];
    if max_clip - min_clip < 1e-9 {
        // 百分位范围过窄，退回到完整范围
        min_clip = finite[0];
        max_clip = finite[last];
    }
    debug!(
        "深度归一化: [{:.1}%, {:.1}%] -> [{:.3}, {:.3}]",
        min_percentile, max_percentile, min_clip, max_clip
    );

    let range = max_clip - min_clip;
    distances
        .iter()
        .map(|&d| {
            if !d.is_finite() {
                d
            } else if range > 1e-9 {
                ((d.clamp(min_clip, max_clip) - min_clip) / range).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// JET 着色的深度图，背景为黑色
pub fn depth_image(frame: &FrameBuffer) -> RgbImage {
    let normalized = normalize_depth(&frame.distance_buffer(), 1.0, 99.0);
    let inverted: Vec<f64> = normalized.iter().map(|&d| 1.0 - d).collect();
    let colors = apply_colormap_jet(&inverted);

    let (width, height) = (frame.width as u32, frame.height as u32);
    RgbImage::from_fn(width, height, |x, y| {
        let row = (height - 1 - y) as usize;
        Rgb(colors[row * frame.width + x as usize])
    })
}

fn output_path(dir: &Path, stem: &str, suffix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{stem}{suffix}.{extension}"))
}

/// 保存渲染结果，返回写入的文件路径。零尺寸图像不保存。
pub fn save_render_output(
    output: &RenderOutput,
    dir: &Path,
    stem: &str,
    format: &str,
    save_depth: bool,
) -> Result<Vec<PathBuf>> {
    let frame = &output.frame;
    if frame.is_empty() {
        warn!("[{stem}] 图像尺寸为零，不保存");
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir)?;

    let color_path = output_path(dir, stem, "", format);
    frame.to_image().save(&color_path)?;
    info!("图像已保存到 {}", color_path.display());
    let mut written = vec![color_path];

    if save_depth {
        if output.has_depth {
            let depth_path = output_path(dir, stem, "_depth", "png");
            depth_image(frame).save(&depth_path)?;
            info!("深度图已保存到 {}", depth_path.display());
            written.push(depth_path);
        } else {
            debug!("[{stem}] 非Z-缓冲模式，跳过深度图");
        }
    }
    Ok(written)
}
