use crate::material_system::color::Color;
use nalgebra::Point2;

/// 二维线段，线框模式的输出单元
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
    pub color: Color,
    /// 端点在视点空间中的 z 值（深度测试线框使用）
    pub depth: Option<(f64, f64)>,
}

impl Line2D {
    pub fn new(p1: Point2<f64>, p2: Point2<f64>, color: Color) -> Self {
        Self {
            p1,
            p2,
            color,
            depth: None,
        }
    }

    pub fn with_depth(mut self, z1: f64, z2: f64) -> Self {
        self.depth = Some((z1, z2));
        self
    }

    pub fn endpoints(&self) -> [Point2<f64>; 2] {
        [self.p1, self.p2]
    }
}
