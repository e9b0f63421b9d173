use crate::error::{RenderError, Result};
use crate::geometry::transform::transform_point;
use crate::material_system::color::Color;
use nalgebra::{Matrix4, Point3};
use rayon::prelude::*;

/// 多边形面：按顺序引用图形点列表的索引
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<usize>,
}

impl Face {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 面的边（索引对）。两点面是一条线段；三点及以上的面首尾闭合。
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.indices.len();
        let edge_count = match n {
            0 | 1 => 0,
            2 => 1,
            _ => n,
        };
        (0..edge_count).map(move |i| (self.indices[i], self.indices[(i + 1) % n]))
    }
}

/// Phong 材质参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// 镜面反射指数
    pub reflection_coefficient: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::zeros(),
            diffuse: Color::zeros(),
            specular: Color::zeros(),
            reflection_coefficient: 0.0,
        }
    }
}

impl Material {
    /// 关闭光照时使用的材质：环境反射取平面颜色，漫反射和镜面反射为零
    pub fn unlit(color: Color) -> Self {
        Self {
            ambient: color,
            ..Default::default()
        }
    }
}

/// 三维图形：点、面以及材质属性
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub points: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
    pub material: Material,
    /// 不使用光照时的平面颜色
    pub color: Color,
}

impl Figure {
    pub fn new(points: Vec<Point3<f64>>, faces: Vec<Face>) -> Self {
        Self {
            points,
            faces,
            material: Material::default(),
            color: Color::zeros(),
        }
    }

    /// 从以0为起点的索引表构造
    pub fn from_tables(points: &[[f64; 3]], faces: &[&[usize]]) -> Self {
        Self::new(
            points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect(),
            faces.iter().map(|f| Face::new(f.to_vec())).collect(),
        )
    }

    /// 对所有点应用变换矩阵
    pub fn apply_transform(&mut self, matrix: &Matrix4<f64>) {
        self.points
            .par_iter_mut()
            .for_each(|p| *p = transform_point(p, matrix));
    }

    /// 返回变换后的副本
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Self {
        let mut copy = self.clone();
        copy.apply_transform(matrix);
        copy
    }

    /// 检查所有面索引都小于点数
    pub fn validate(&self) -> Result<()> {
        let points = self.points.len();
        self.faces
            .iter()
            .flat_map(|face| face.indices.iter())
            .find(|&&index| index >= points)
            .map_or(Ok(()), |&index| {
                Err(RenderError::FaceIndexOutOfRange { index, points })
            })
    }

    /// 所有面的边，可能有重复（相邻面共享的边）
    pub fn edges(&self) -> impl Iterator<Item = (Point3<f64>, Point3<f64>)> + '_ {
        self.faces
            .iter()
            .flat_map(|face| face.edges())
            .map(|(a, b)| (self.points[a], self.points[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::transform::TransformFactory;

    #[test]
    fn face_edges_close_polygons_but_not_lines() {
        let line = Face::new(vec![3, 7]);
        assert_eq!(line.edges().collect::<Vec<_>>(), vec![(3, 7)]);

        let quad = Face::new(vec![0, 1, 2, 3]);
        assert_eq!(
            quad.edges().collect::<Vec<_>>(),
            vec![(0, 1), (1, 2), (2, 3), (3, 0)]
        );
    }

    #[test]
    fn validate_rejects_out_of_range_indices() {
        let ok = Figure::from_tables(&[[0.0; 3], [1.0, 0.0, 0.0]], &[&[0, 1]]);
        assert!(ok.validate().is_ok());

        let bad = Figure::from_tables(&[[0.0; 3], [1.0, 0.0, 0.0]], &[&[0, 2]]);
        assert!(matches!(
            bad.validate(),
            Err(RenderError::FaceIndexOutOfRange {
                index: 2,
                points: 2
            })
        ));
    }

    #[test]
    fn apply_transform_moves_every_point() {
        let mut figure = Figure::from_tables(&[[0.0; 3], [1.0, 1.0, 1.0]], &[&[0, 1]]);
        figure.apply_transform(&TransformFactory::translation(&Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(figure.points[0], Point3::new(1.0, 2.0, 3.0));
        assert_eq!(figure.points[1], Point3::new(2.0, 3.0, 4.0));
    }
}
