//! # Z-缓冲三角形光栅化
//!
//! 扫描线算法：逐行求三角形左右边界，在行内逐像素插值 1/z。
//! 1/z 在屏幕空间中是线性的，因此用三角形所在平面一次算出 x、y 方向的梯度。

use crate::core::frame_buffer::{FrameBand, FrameBuffer};
use crate::core::projection::ScreenProjection;
use crate::geometry::figure::Material;
use crate::material_system::color::Color;
use crate::material_system::shading::SurfacePoint;
use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;

/// 三角形光栅化数据：屏幕坐标与 1/z 平面方程
#[derive(Debug, Clone, Copy)]
pub struct TriangleData {
    pub screen: [Point2<f64>; 3],
    /// 重心处的屏幕坐标与 1/z
    x_g: f64,
    y_g: f64,
    inv_z_g: f64,
    dzdx: f64,
    dzdy: f64,
    /// 视点空间平面法向量（未归一化）
    pub normal: Vector3<f64>,
    pub material: Material,
    pub projection: ScreenProjection,
}

impl TriangleData {
    /// 由视点空间三个顶点建立光栅化数据。
    ///
    /// 顶点必须位于相机前方（z < 0）；退化三角形（屏幕面积为零或平面经过相机）返回 `None`。
    pub fn setup(
        a: &Point3<f64>,
        b: &Point3<f64>,
        c: &Point3<f64>,
        projection: ScreenProjection,
        material: Material,
    ) -> Option<Self> {
        if a.z >= 0.0 || b.z >= 0.0 || c.z >= 0.0 {
            return None;
        }
        let screen = [
            projection.project(a),
            projection.project(b),
            projection.project(c),
        ];
        let [pa, pb, pc] = screen;
        let area = (pb - pa).perp(&(pc - pa));
        if area.abs() < 1e-12 {
            return None;
        }

        let u = b - a;
        let v = c - a;
        let w = u.cross(&v);
        let k = w.dot(&a.coords);
        if k.abs() < f64::EPSILON {
            return None;
        }

        Some(Self {
            screen,
            x_g: (pa.x + pb.x + pc.x) / 3.0,
            y_g: (pa.y + pb.y + pc.y) / 3.0,
            inv_z_g: 1.0 / (3.0 * a.z) + 1.0 / (3.0 * b.z) + 1.0 / (3.0 * c.z),
            dzdx: w.x / (-projection.d * k),
            dzdy: w.y / (-projection.d * k),
            normal: w,
            material,
            projection,
        })
    }

    /// 像素 (x, y) 处的 1/z
    #[inline]
    pub fn inv_z_at(&self, x: f64, y: f64) -> f64 {
        self.inv_z_g + (x - self.x_g) * self.dzdx + (y - self.y_g) * self.dzdy
    }

    /// 覆盖的像素行 `[min, max]`
    pub fn row_span(&self) -> (i64, i64) {
        let ys = self.screen.map(|p| p.y);
        let min = ys[0].min(ys[1]).min(ys[2]);
        let max = ys[0].max(ys[1]).max(ys[2]);
        ((min + 0.5).round() as i64, (max - 0.5).round() as i64)
    }

    /// 第 `y` 行与三角形相交的像素列 `[left, right]`
    pub fn column_span(&self, y: i64) -> Option<(i64, i64)> {
        let y = y as f64;
        let mut x_left = f64::INFINITY;
        let mut x_right = f64::NEG_INFINITY;
        for i in 0..3 {
            let p = self.screen[i];
            let q = self.screen[(i + 1) % 3];
            if p.y == q.y || (y - p.y) * (y - q.y) > 0.0 {
                continue;
            }
            let x = q.x + (p.x - q.x) * (y - q.y) / (p.y - q.y);
            x_left = x_left.min(x);
            x_right = x_right.max(x);
        }
        if x_left > x_right {
            return None;
        }
        let left = (x_left + 0.5).round() as i64;
        let right = (x_right - 0.5).round() as i64;
        (left <= right).then_some((left, right))
    }

    /// 遍历行范围 `[row_start, row_end)` 与列范围 `[0, width)` 内被覆盖的像素
    pub fn for_each_pixel<F>(&self, row_start: i64, row_end: i64, width: i64, mut f: F)
    where
        F: FnMut(i64, i64, f64),
    {
        let (y_min, y_max) = self.row_span();
        for y in y_min.max(row_start)..=y_max.min(row_end - 1) {
            let Some((left, right)) = self.column_span(y) else {
                continue;
            };
            for x in left.max(0)..=right.min(width - 1) {
                f(x, y, self.inv_z_at(x as f64, y as f64));
            }
        }
    }

    /// 像素对应的视点空间表面点
    #[inline]
    pub fn surface_at(&self, x: i64, y: i64, inv_z: f64) -> SurfacePoint {
        let position = self.projection.unproject(x as f64, y as f64, inv_z);
        SurfacePoint::facing_viewer(position, self.normal)
    }
}

/// 把三角形光栅化进一个行视图，按给定顺序处理
pub fn rasterize_band<S>(band: &mut FrameBand, triangles: &[TriangleData], shader: &S)
where
    S: Fn(&Material, &SurfacePoint) -> Color,
{
    let (row_start, row_end) = band.row_range();
    let width = band.width as i64;
    for triangle in triangles {
        triangle.for_each_pixel(row_start, row_end, width, |x, y, inv_z| {
            band.write_if_closer(x, y, inv_z, || {
                shader(&triangle.material, &triangle.surface_at(x, y, inv_z))
            });
        });
    }
}

/// 光栅化所有三角形。
///
/// 并行时画布按行切分，每个行带独立地按相同顺序处理全部三角形，结果与串行一致。
pub fn rasterize_triangles<S>(
    frame: &mut FrameBuffer,
    triangles: &[TriangleData],
    shader: S,
    parallel: bool,
) where
    S: Fn(&Material, &SurfacePoint) -> Color + Sync,
{
    if !parallel {
        rasterize_band(&mut frame.full_band(), triangles, &shader);
        return;
    }

    let bands = rayon::current_num_threads() * 4;
    let rows_per_band = frame.height.div_ceil(bands.max(1)).max(1);
    frame
        .bands_mut(rows_per_band)
        .into_par_iter()
        .for_each(|mut band| rasterize_band(&mut band, triangles, &shader));
}
