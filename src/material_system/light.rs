use crate::core::shadow_map::ShadowMask;
use crate::geometry::transform::{transform_point, transform_vector};
use crate::material_system::color::Color;
use nalgebra::{Matrix4, Point3, Vector3};

/// 光源类型
#[derive(Debug, Clone)]
pub enum LightKind {
    /// 只提供环境光分量
    Ambient,
    /// 无穷远光源，`direction` 为光线的传播方向
    Infinite { direction: Vector3<f64> },
    /// 点光源，可选聚光角（弧度）与阴影遮罩
    Point {
        position: Point3<f64>,
        spot_angle: Option<f64>,
        shadow: Option<ShadowMask>,
    },
}

/// 光源：三种强度分量加上类型相关的数据
#[derive(Debug, Clone)]
pub struct Light {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub kind: LightKind,
}

impl Light {
    /// 仅环境光
    pub fn ambient(ambient: Color) -> Self {
        Self {
            ambient,
            diffuse: Color::zeros(),
            specular: Color::zeros(),
            kind: LightKind::Ambient,
        }
    }

    /// 关闭光照时使用的唯一光源：白色环境光，配合 [`Material::unlit`] 输出平面颜色
    ///
    /// [`Material::unlit`]: crate::geometry::figure::Material::unlit
    pub fn unlit() -> Self {
        Self::ambient(Color::new(1.0, 1.0, 1.0))
    }

    /// 点光源的位置
    pub fn position(&self) -> Option<Point3<f64>> {
        match &self.kind {
            LightKind::Point { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn shadow_mask(&self) -> Option<&ShadowMask> {
        match &self.kind {
            LightKind::Point { shadow, .. } => shadow.as_ref(),
            _ => None,
        }
    }

    /// 给点光源挂上阴影遮罩，其他类型忽略
    pub fn set_shadow_mask(&mut self, mask: ShadowMask) {
        if let LightKind::Point { shadow, .. } = &mut self.kind {
            *shadow = Some(mask);
        }
    }

    /// 变换到视点空间：方向只受旋转影响，位置受完整变换影响
    pub fn transformed(&self, eye: &Matrix4<f64>) -> Self {
        let kind = match &self.kind {
            LightKind::Ambient => LightKind::Ambient,
            LightKind::Infinite { direction } => LightKind::Infinite {
                direction: transform_vector(direction, eye),
            },
            LightKind::Point {
                position,
                spot_angle,
                shadow,
            } => LightKind::Point {
                position: transform_point(position, eye),
                spot_angle: *spot_angle,
                shadow: shadow.clone(),
            },
        };
        Self { kind, ..self.clone() }
    }
}
