use crate::error::{RenderError, Result, try_vec_with_capacity};
use crate::geometry::figure::Figure;
use crate::geometry::transform::TransformFactory;
use log::debug;
use nalgebra::Matrix4;

/// 分形展开（迭代函数系统）
///
/// 每次迭代把当前集合中的每个图形替换为它的 `P` 个副本（`P` 为点数）：
/// 副本按 `1/scale` 缩放，并平移使副本的第 `i` 个点与原图形的第 `i` 个点重合。
/// 副本之间相互独立，不合并共享的几何。`iterations == 0` 时返回原图形。
pub fn generate_fractal(base: &Figure, iterations: u32, scale: f64) -> Result<Vec<Figure>> {
    if scale == 0.0 || !scale.is_finite() {
        return Err(RenderError::malformed(
            "Figure",
            "fractalScale",
            format!("fractal scale must be a finite non-zero number, got {scale}"),
        ));
    }

    let shrink = TransformFactory::scaling(1.0 / scale);
    let mut fractal = vec![base.clone()];

    for iteration in 0..iterations {
        let copies = fractal
            .iter()
            .try_fold(0usize, |acc, f| acc.checked_add(f.points.len()))
            .ok_or_else(|| {
                RenderError::InsufficientResources(format!(
                    "fractal iteration {} overflows the figure count",
                    iteration + 1
                ))
            })?;
        let mut next = try_vec_with_capacity(copies, "fractal figures")?;

        for figure in &fractal {
            let scaled = figure.transformed(&shrink);
            for (anchor, scaled_anchor) in figure.points.iter().zip(&scaled.points) {
                let offset = Matrix4::new_translation(&(anchor - scaled_anchor));
                next.push(scaled.transformed(&offset));
            }
        }

        debug!("分形迭代 {}: {} 个图形", iteration + 1, next.len());
        fractal = next;
    }

    Ok(fractal)
}
