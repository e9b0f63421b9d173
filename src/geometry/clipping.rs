//! # 视锥裁剪
//!
//! 在视点空间（相机位于原点，看向 -Z）中对多边形和线段做 Sutherland-Hodgman 裁剪。

use crate::geometry::figure::{Face, Figure};
use nalgebra::{Point3, Vector3};

/// 裁剪平面：`normal · p + offset >= 0` 为内侧
#[derive(Debug, Clone, Copy)]
struct ClipPlane {
    normal: Vector3<f64>,
    offset: f64,
}

impl ClipPlane {
    #[inline]
    fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.offset
    }

    #[inline]
    fn intersect(&self, a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
        let da = self.signed_distance(a);
        let db = self.signed_distance(b);
        let t = da / (da - db);
        a + (b - a) * t
    }
}

/// 视锥：近平面 z = -near，远平面 z = -far，左右/上下由水平视场角和宽高比决定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub near: f64,
    pub far: f64,
    /// 近平面上的半宽
    pub right: f64,
    /// 近平面上的半高
    pub top: f64,
}

impl Frustum {
    pub fn new(hfov_deg: f64, aspect_ratio: f64, near: f64, far: f64) -> Self {
        let right = near * (hfov_deg.to_radians() / 2.0).tan();
        Self {
            near,
            far,
            right,
            top: right / aspect_ratio,
        }
    }

    fn planes(&self) -> [ClipPlane; 6] {
        let plane = |x: f64, y: f64, z: f64, offset: f64| ClipPlane {
            normal: Vector3::new(x, y, z),
            offset,
        };
        [
            plane(0.0, 0.0, -1.0, -self.near),
            plane(0.0, 0.0, 1.0, self.far),
            plane(-self.near, 0.0, -self.right, 0.0),
            plane(self.near, 0.0, -self.right, 0.0),
            plane(0.0, -self.near, -self.top, 0.0),
            plane(0.0, self.near, -self.top, 0.0),
        ]
    }

    /// 裁剪凸多边形，返回位于视锥内的部分（可能为空）
    pub fn clip_polygon(&self, polygon: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let mut output = polygon.to_vec();
        for plane in self.planes() {
            if output.is_empty() {
                break;
            }
            let input = std::mem::take(&mut output);
            for (i, current) in input.iter().enumerate() {
                let previous = &input[(i + input.len() - 1) % input.len()];
                let current_inside = plane.signed_distance(current) >= 0.0;
                let previous_inside = plane.signed_distance(previous) >= 0.0;
                if current_inside {
                    if !previous_inside {
                        output.push(plane.intersect(previous, current));
                    }
                    output.push(*current);
                } else if previous_inside {
                    output.push(plane.intersect(previous, current));
                }
            }
        }
        output
    }

    /// 裁剪线段，完全在视锥外时返回 `None`
    pub fn clip_segment(
        &self,
        a: Point3<f64>,
        b: Point3<f64>,
    ) -> Option<(Point3<f64>, Point3<f64>)> {
        let (mut a, mut b) = (a, b);
        for plane in self.planes() {
            let da = plane.signed_distance(&a);
            let db = plane.signed_distance(&b);
            match (da >= 0.0, db >= 0.0) {
                (true, true) => {}
                (false, false) => return None,
                (true, false) => b = plane.intersect(&a, &b),
                (false, true) => a = plane.intersect(&a, &b),
            }
        }
        Some((a, b))
    }

    /// 裁剪视点空间中的图形。多边形面裁剪后重新扇形三角化，两点面按线段裁剪。
    pub fn clip_figure(&self, figure: &Figure) -> Figure {
        let mut points = Vec::new();
        let mut faces = Vec::new();

        for face in &figure.faces {
            let corners: Vec<_> = face.indices.iter().map(|&i| figure.points[i]).collect();
            if corners.len() == 2 {
                if let Some((a, b)) = self.clip_segment(corners[0], corners[1]) {
                    let start = points.len();
                    points.extend([a, b]);
                    faces.push(Face::new(vec![start, start + 1]));
                }
                continue;
            }

            let clipped = self.clip_polygon(&corners);
            if clipped.len() < 3 {
                continue;
            }
            let start = points.len();
            let n = clipped.len();
            points.extend(clipped);
            faces.extend((1..n - 1).map(|k| Face::new(vec![start, start + k, start + k + 1])));
        }

        Figure {
            points,
            faces,
            material: figure.material,
            color: figure.color,
        }
    }
}
