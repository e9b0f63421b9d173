//! # Phong 着色
//!
//! 所有计算都在视点空间中进行：相机位于原点，因此视线方向是 `-p`。

use crate::geometry::figure::Material;
use crate::material_system::color::{Color, clamp_color};
use crate::material_system::light::{Light, LightKind};
use nalgebra::{Point3, Vector3};

/// 被着色的表面点（视点空间）
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub position: Point3<f64>,
    /// 单位法向量，已朝向观察者
    pub normal: Vector3<f64>,
}

impl SurfacePoint {
    /// 以三角形所在平面构造表面点。法向量翻转到朝向相机一侧。
    pub fn facing_viewer(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        let normal = normal.normalize();
        let normal = if normal.dot(&position.coords) > 0.0 {
            -normal
        } else {
            normal
        };
        Self { position, normal }
    }
}

/// 聚光衰减：夹角超过聚光角时为0，正对时为1
#[inline]
pub fn spot_factor(cos_theta: f64, spot_angle: f64) -> f64 {
    let cos_alpha = spot_angle.cos();
    if cos_theta <= cos_alpha {
        0.0
    } else {
        1.0 - (1.0 - cos_theta) / (1.0 - cos_alpha)
    }
}

/// 单个光源的漫反射与镜面反射（不含环境光）
fn direct_contribution(
    material: &Material,
    light: &Light,
    surface: &SurfacePoint,
    to_light: Vector3<f64>,
    spot_angle: Option<f64>,
) -> Color {
    let n = surface.normal;
    let cos_theta = n.dot(&to_light);
    if cos_theta <= 0.0 {
        return Color::zeros();
    }

    let diffuse_scale = match spot_angle {
        Some(alpha) if alpha > 0.0 => spot_factor(cos_theta, alpha),
        _ => cos_theta,
    };
    let mut color = light.diffuse.component_mul(&material.diffuse) * diffuse_scale;

    let reflected = 2.0 * cos_theta * n - to_light;
    let view = -surface.position.coords;
    if let Some(view) = view.try_normalize(f64::EPSILON) {
        let cos_beta = reflected.dot(&view);
        if cos_beta > 0.0 {
            color += light.specular.component_mul(&material.specular)
                * cos_beta.powf(material.reflection_coefficient);
        }
    }
    color
}

/// 计算表面点的最终颜色（已截断到 [0, 1]）
pub fn shade(material: &Material, lights: &[Light], surface: &SurfacePoint) -> Color {
    let mut color = Color::zeros();
    for light in lights {
        color += light.ambient.component_mul(&material.ambient);

        match &light.kind {
            LightKind::Ambient => {}
            LightKind::Infinite { direction } => {
                if let Some(to_light) = (-direction).try_normalize(f64::EPSILON) {
                    color += direct_contribution(material, light, surface, to_light, None);
                }
            }
            LightKind::Point {
                position,
                spot_angle,
                ..
            } => {
                if light
                    .shadow_mask()
                    .is_some_and(|mask| mask.is_occluded(&surface.position))
                {
                    continue;
                }
                if let Some(to_light) = (position - surface.position).try_normalize(f64::EPSILON) {
                    color += direct_contribution(material, light, surface, to_light, *spot_angle);
                }
            }
        }
    }
    clamp_color(&color)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diffuse_material() -> Material {
        Material {
            diffuse: Color::new(0.5, 0.5, 0.5),
            ..Default::default()
        }
    }

    fn infinite(direction: Vector3<f64>) -> Light {
        Light {
            ambient: Color::zeros(),
            diffuse: Color::new(1.0, 1.0, 1.0),
            specular: Color::zeros(),
            kind: LightKind::Infinite { direction },
        }
    }

    fn surface() -> SurfacePoint {
        SurfacePoint::facing_viewer(Point3::new(0.0, 0.0, -5.0), Vector3::z())
    }

    #[test]
    fn head_on_diffuse_equals_reflection() {
        let color = shade(
            &diffuse_material(),
            &[infinite(-Vector3::z())],
            &surface(),
        );
        assert!((color - Color::new(0.5, 0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn grazing_light_contributes_nothing() {
        let almost = infinite(Vector3::new(-1.0, 0.0, -1e-6));
        let color = shade(&diffuse_material(), &[almost], &surface());
        assert!(color.norm() < 1e-5);

        let behind = infinite(Vector3::z());
        assert_eq!(shade(&diffuse_material(), &[behind], &surface()), Color::zeros());
    }

    #[test]
    fn diffuse_falls_off_with_cosine() {
        let angle = 60f64.to_radians();
        let light = infinite(-Vector3::new(angle.sin(), 0.0, angle.cos()));
        let color = shade(&diffuse_material(), &[light], &surface());
        assert!((color.x - 0.25).abs() < 1e-12);
    }

    #[test]
    fn ambient_accumulates_over_lights_and_clamps() {
        let material = Material::unlit(Color::new(0.6, 0.2, 0.0));
        let lights = [Light::unlit(), Light::unlit()];
        let color = shade(&material, &lights, &surface());
        assert_eq!(color, Color::new(1.0, 0.4, 0.0));
    }

    #[test]
    fn normal_is_flipped_toward_viewer() {
        let s = SurfacePoint::facing_viewer(Point3::new(0.0, 0.0, -5.0), -Vector3::z() * 3.0);
        assert!((s.normal - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn specular_peaks_along_mirror_direction() {
        let material = Material {
            specular: Color::new(1.0, 1.0, 1.0),
            reflection_coefficient: 10.0,
            ..Default::default()
        };
        let light = Light {
            specular: Color::new(1.0, 1.0, 1.0),
            ..infinite(-Vector3::z())
        };
        let color = shade(&material, &[light], &surface());
        assert!((color - Color::new(1.0, 1.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn spot_light_cuts_off_outside_cone() {
        assert_eq!(spot_factor(0.5, 30f64.to_radians()), 0.0);
        assert!((spot_factor(1.0, 30f64.to_radians()) - 1.0).abs() < 1e-12);

        let spot = Light {
            ambient: Color::zeros(),
            diffuse: Color::new(1.0, 1.0, 1.0),
            specular: Color::zeros(),
            kind: LightKind::Point {
                // 与法向量约成 26.6 度
                position: Point3::new(1.0, 0.0, -3.0),
                spot_angle: Some(20f64.to_radians()),
                shadow: None,
            },
        };
        assert_eq!(shade(&diffuse_material(), &[spot], &surface()), Color::zeros());
    }
}
