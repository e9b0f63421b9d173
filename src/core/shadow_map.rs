use crate::core::projection::{ImageFit, ScreenProjection, project_point};
use crate::core::rasterizer::TriangleData;
use crate::error::{Result, try_vec_with_capacity};
use crate::geometry::figure::{Figure, Material};
use crate::geometry::transform::{TransformFactory, transform_point};
use crate::geometry::triangulate::triangulate_face;
use atomic_float::AtomicF64;
use log::debug;
use nalgebra::{Matrix4, Point3};
use rayon::prelude::*;
use std::sync::atomic::Ordering;

/// 深度比较的固定容差（1/z 单位），另加采样点邻域的深度斜率
const SHADOW_BIAS: f64 = 1e-4;

/// 点光源的阴影遮罩：从光源位置看向原点渲染的 1/z 深度缓冲
#[derive(Debug, Clone)]
pub struct ShadowMask {
    pub width: usize,
    pub height: usize,
    /// 与主 Z-缓冲相同的约定：1/z，+inf 表示无遮挡物
    pub depth_buffer: Vec<f64>,
    projection: ScreenProjection,
    /// 主视点空间 -> 光源视点空间
    to_light: Matrix4<f64>,
}

impl ShadowMask {
    /// 不遮挡任何点的空遮罩
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            depth_buffer: Vec::new(),
            projection: ScreenProjection {
                d: 1.0,
                dx: 0.0,
                dy: 0.0,
            },
            to_light: Matrix4::identity(),
        }
    }

    /// 生成阴影遮罩
    ///
    /// * `figures` - 世界空间中的实体图形
    /// * `light_position` - 光源的世界坐标
    /// * `inverse_eye` - 主视点变换的逆矩阵
    /// * `size` - 遮罩边长（像素）
    pub fn build(
        figures: &[Figure],
        light_position: &Point3<f64>,
        inverse_eye: &Matrix4<f64>,
        size: usize,
        parallel: bool,
    ) -> Result<Self> {
        let light_eye = TransformFactory::eye_point(light_position)?;

        let mut skipped = 0usize;
        let mut corners = Vec::new();
        for figure in figures {
            let points: Vec<Point3<f64>> = figure
                .points
                .iter()
                .map(|p| transform_point(p, &light_eye))
                .collect();
            for face in figure.faces.iter().filter(|f| f.len() >= 3) {
                for triangle in triangulate_face(face) {
                    let [a, b, c] = [0, 1, 2].map(|i| points[triangle.indices[i]]);
                    if a.z >= 0.0 || b.z >= 0.0 || c.z >= 0.0 {
                        skipped += 1;
                        continue;
                    }
                    corners.push([a, b, c]);
                }
            }
        }

        let fit = ImageFit::from_points(
            corners.iter().flatten().map(|p| project_point(p, 1.0)),
            size as f64,
        );
        let Some(fit) = fit else {
            debug!("阴影遮罩为空：光源视野内没有三角形");
            return Ok(Self {
                to_light: light_eye * inverse_eye,
                ..Self::empty()
            });
        };
        let projection = fit.screen_projection(1.0);

        let triangles: Vec<TriangleData> = corners
            .iter()
            .filter_map(|[a, b, c]| TriangleData::setup(a, b, c, projection, Material::default()))
            .collect();

        let (width, height) = (fit.width, fit.height);
        let texels = width.checked_mul(height).unwrap_or(usize::MAX);
        let mut depth = try_vec_with_capacity(texels, "shadow mask")?;
        depth.extend((0..texels).map(|_| AtomicF64::new(f64::INFINITY)));

        let write = |triangle: &TriangleData| {
            triangle.for_each_pixel(0, height as i64, width as i64, |x, y, inv_z| {
                depth[y as usize * width + x as usize].fetch_min(inv_z, Ordering::Relaxed);
            });
        };
        if parallel {
            triangles.par_iter().for_each(write);
        } else {
            triangles.iter().for_each(write);
        }

        debug!(
            "阴影遮罩生成完成: {}x{}, {} 个三角形, 跳过 {}",
            width,
            height,
            triangles.len(),
            skipped
        );

        Ok(Self {
            width,
            height,
            depth_buffer: depth.into_iter().map(AtomicF64::into_inner).collect(),
            projection,
            to_light: light_eye * inverse_eye,
        })
    }

    /// 主视点空间中的点是否被遮挡（最近采样）
    pub fn is_occluded(&self, eye_point: &Point3<f64>) -> bool {
        if self.depth_buffer.is_empty() {
            return false;
        }
        let light_point = transform_point(eye_point, &self.to_light);
        if light_point.z >= 0.0 {
            return false;
        }

        let texel = self.projection.project(&light_point);
        let (x, y) = (texel.x.round(), texel.y.round());
        if x < 0.0 || y < 0.0 || x >= self.width as f64 || y >= self.height as f64 {
            return false;
        }

        let (x, y) = (x as usize, y as usize);
        let stored = self.depth_buffer[y * self.width + x];
        if !stored.is_finite() {
            return false;
        }
        let surface = 1.0 / light_point.z;
        surface - stored > SHADOW_BIAS + self.slope_at(x, y, stored)
    }

    /// 纹素与四邻域中有限值的最大 1/z 差，最近采样最多偏离半个纹素
    fn slope_at(&self, x: usize, y: usize, stored: f64) -> f64 {
        let neighbors = [
            x.checked_sub(1).map(|x| (x, y)),
            (x + 1 < self.width).then_some((x + 1, y)),
            y.checked_sub(1).map(|y| (x, y)),
            (y + 1 < self.height).then_some((x, y + 1)),
        ];
        neighbors
            .into_iter()
            .flatten()
            .map(|(nx, ny)| self.depth_buffer[ny * self.width + nx])
            .filter(|d| d.is_finite())
            .map(|d| (d - stored).abs())
            .fold(0.0, f64::max)
    }
}
