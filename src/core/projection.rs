//! # 透视投影与图像适配
//!
//! 视点空间点 `(x, y, z)`（z < 0）投影到 `(d·x/−z, d·y/−z)`。
//! 所有投影点的包围盒决定输出图像的尺寸、缩放和平移。

use crate::geometry::clipping::Frustum;
use crate::geometry::figure::Figure;
use crate::geometry::line::Line2D;
use log::debug;
use nalgebra::{Point2, Point3};

/// 透视除法
#[inline]
pub fn project_point(point: &Point3<f64>, d: f64) -> Point2<f64> {
    Point2::new(d * point.x / -point.z, d * point.y / -point.z)
}

/// 屏幕投影参数：`screen = d·p/−z + (dx, dy)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjection {
    pub d: f64,
    pub dx: f64,
    pub dy: f64,
}

impl ScreenProjection {
    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        let p = project_point(point, self.d);
        Point2::new(p.x + self.dx, p.y + self.dy)
    }

    /// 投影的逆：由屏幕坐标与 1/z 还原视点空间点
    #[inline]
    pub fn unproject(&self, x: f64, y: f64, inv_z: f64) -> Point3<f64> {
        let z = 1.0 / inv_z;
        Point3::new((x - self.dx) * -z / self.d, (y - self.dy) * -z / self.d, z)
    }
}

/// 由二维包围盒得到的图像尺寸与缩放/平移参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFit {
    pub width: usize,
    pub height: usize,
    /// 均匀缩放 d' = 0.95 · size / range
    pub scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl ImageFit {
    /// 适配到边长为 `size` 的正方形画布内。没有点或所有点重合时返回 `None`。
    pub fn from_points<I>(points: I, size: f64) -> Option<Self>
    where
        I: IntoIterator<Item = Point2<f64>>,
    {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            if !(p.x.is_finite() && p.y.is_finite()) {
                continue;
            }
            min = min.inf(&p);
            max = max.sup(&p);
        }

        let x_range = max.x - min.x;
        let y_range = max.y - min.y;
        let range = x_range.max(y_range);
        if !range.is_finite() || range <= 0.0 || size <= 0.0 {
            return None;
        }

        let image_x = (size * x_range / range).round().max(1.0);
        let image_y = (size * y_range / range).round().max(1.0);
        let scale = 0.95 * size / range;
        let dx = image_x / 2.0 - scale * (min.x + max.x) / 2.0;
        let dy = image_y / 2.0 - scale * (min.y + max.y) / 2.0;

        debug!(
            "图像适配: {}x{}, d' = {:.4}, dx = {:.4}, dy = {:.4}",
            image_x, image_y, scale, dx, dy
        );

        Some(Self {
            width: image_x as usize,
            height: image_y as usize,
            scale,
            dx,
            dy,
        })
    }

    /// 对已投影（缩放前）的点应用缩放和平移
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::new(p.x * self.scale + self.dx, p.y * self.scale + self.dy)
    }

    /// 组合投影距离 `d`，得到直接作用于视点空间点的投影
    pub fn screen_projection(&self, d: f64) -> ScreenProjection {
        ScreenProjection {
            d: d * self.scale,
            dx: self.dx,
            dy: self.dy,
        }
    }

    pub fn apply_to_line(&self, line: &Line2D) -> Line2D {
        Line2D {
            p1: self.apply(&line.p1),
            p2: self.apply(&line.p2),
            ..*line
        }
    }
}

/// 视点空间线段整理结果
#[derive(Debug, Default)]
pub struct ProjectedLines {
    pub lines: Vec<Line2D>,
    /// 因端点位于相机平面或其后而跳过的线段数
    pub skipped: usize,
}

/// 把视点空间中图形的所有边投影为带深度的二维线段。
///
/// 给定视锥时按视锥裁剪每条边，否则跳过端点 z ≥ 0 的边。
pub fn project_edges(figures: &[Figure], d: f64, frustum: Option<&Frustum>) -> ProjectedLines {
    let mut result = ProjectedLines::default();
    for figure in figures {
        for (a, b) in figure.edges() {
            let (a, b) = match frustum {
                Some(frustum) => match frustum.clip_segment(a, b) {
                    Some(segment) => segment,
                    None => continue,
                },
                None if a.z >= 0.0 || b.z >= 0.0 => {
                    result.skipped += 1;
                    continue;
                }
                None => (a, b),
            };
            let line = Line2D::new(project_point(&a, d), project_point(&b, d), figure.color)
                .with_depth(a.z, b.z);
            result.lines.push(line);
        }
    }
    result
}
