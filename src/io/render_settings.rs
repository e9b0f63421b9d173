use crate::error::{RenderError, Result};
use crate::geometry::clipping::Frustum;
use crate::geometry::transform::TransformFactory;
use crate::io::config_loader::SceneConfig;
use crate::material_system::color::Color;
use nalgebra::{Matrix4, Point3, Vector3};
use std::fmt;
use std::str::FromStr;

/// 渲染模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// 二维 L-系统
    LSystem2D,
    Wireframe,
    ZBufferedWireframe,
    ZBuffering,
    LightedZBuffering,
}

impl RenderMode {
    /// 是否使用三角形 Z-缓冲
    pub fn is_z_buffered(self) -> bool {
        matches!(self, RenderMode::ZBuffering | RenderMode::LightedZBuffering)
    }

    pub fn is_lighted(self) -> bool {
        self == RenderMode::LightedZBuffering
    }
}

impl FromStr for RenderMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2DLSystem" => Ok(RenderMode::LSystem2D),
            "Wireframe" => Ok(RenderMode::Wireframe),
            "ZBufferedWireframe" => Ok(RenderMode::ZBufferedWireframe),
            "ZBuffering" => Ok(RenderMode::ZBuffering),
            "LightedZBuffering" => Ok(RenderMode::LightedZBuffering),
            other => Err(RenderError::UnknownRenderMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderMode::LSystem2D => "2DLSystem",
            RenderMode::Wireframe => "Wireframe",
            RenderMode::ZBufferedWireframe => "ZBufferedWireframe",
            RenderMode::ZBuffering => "ZBuffering",
            RenderMode::LightedZBuffering => "LightedZBuffering",
        };
        f.write_str(name)
    }
}

/// 视锥裁剪参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingSettings {
    pub view_direction: Vector3<f64>,
    /// 水平视场角（度）
    pub hfov: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
}

impl ClippingSettings {
    pub fn frustum(&self) -> Frustum {
        Frustum::new(self.hfov, self.aspect_ratio, self.near, self.far)
    }
}

/// `[General]` 节的全部渲染参数
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub mode: RenderMode,
    /// 画布边长（像素）
    pub size: usize,
    pub background: Color,
    pub eye: Point3<f64>,
    pub nr_figures: usize,
    pub nr_lights: usize,
    pub clipping: Option<ClippingSettings>,
    /// 启用阴影时的遮罩边长
    pub shadow_mask: Option<usize>,
    /// 透视投影距离 d
    pub projection_distance: f64,
    pub multithreading: bool,
    pub seed: Option<u64>,
}

impl RenderSettings {
    pub fn from_config(config: &SceneConfig) -> Result<Self> {
        let general = config.section("General");
        let mode: RenderMode = general.required_string("type")?.parse()?;
        let size = general.required_count("size")?;
        let background = general.color_or("backgroundcolor", Color::zeros())?;

        let needs_eye = mode != RenderMode::LSystem2D;
        let eye = if needs_eye {
            general.required_point3("eye")?
        } else {
            general.point3_or("eye", Point3::new(0.0, 0.0, 1.0))?
        };
        let nr_figures = general.count_or("nrFigures", 0)?;
        let nr_lights = if mode.is_lighted() {
            general.count_or("nrLights", 0)?
        } else {
            0
        };

        let clipping = if needs_eye && general.bool_or("clipping", false)? {
            Some(ClippingSettings {
                view_direction: general.required_vector3("viewDirection")?,
                hfov: general.required_float("hfov")?,
                aspect_ratio: general.required_float("aspectRatio")?,
                near: general.required_float("dNear")?,
                far: general.required_float("dFar")?,
            })
        } else {
            None
        };
        if let Some(c) = &clipping {
            if c.near <= 0.0 || c.far <= c.near {
                return Err(RenderError::malformed(
                    "General",
                    "dFar",
                    format!("clipping planes must satisfy 0 < dNear < dFar, got {} and {}", c.near, c.far),
                ));
            }
            if c.aspect_ratio <= 0.0 {
                return Err(RenderError::malformed(
                    "General",
                    "aspectRatio",
                    "aspect ratio must be positive",
                ));
            }
        }

        let shadow_mask = if mode.is_lighted() && general.bool_or("shadowEnabled", false)? {
            Some(general.required_count("shadowMask")?)
        } else {
            None
        };

        let projection_distance = general.float_or("projectionDistance", 1.0)?;
        if projection_distance <= 0.0 {
            return Err(RenderError::malformed(
                "General",
                "projectionDistance",
                "projection distance must be positive",
            ));
        }

        let seed = if general.contains("seed") {
            let seed = general.required_int("seed")?;
            Some(u64::try_from(seed).map_err(|_| {
                RenderError::malformed("General", "seed", format!("{seed} is negative"))
            })?)
        } else {
            None
        };

        Ok(Self {
            mode,
            size,
            background,
            eye,
            nr_figures,
            nr_lights,
            clipping,
            shadow_mask,
            projection_distance,
            multithreading: general.bool_or("multithreading", true)?,
            seed,
        })
    }

    /// 世界空间 -> 视点空间
    pub fn eye_transform(&self) -> Result<Matrix4<f64>> {
        match &self.clipping {
            Some(clipping) => TransformFactory::eye_point_along(&self.eye, &clipping.view_direction),
            None => TransformFactory::eye_point(&self.eye).map_err(|e| match e {
                RenderError::ViewpointAtOrigin => RenderError::malformed(
                    "General",
                    "eye",
                    "eye point must differ from the origin",
                ),
                other => other,
            }),
        }
    }

    pub fn frustum(&self) -> Option<Frustum> {
        self.clipping.as_ref().map(ClippingSettings::frustum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(general: &str) -> Result<RenderSettings> {
        let config = SceneConfig::load_from_content(&format!("[General]\n{general}"), ".")?;
        RenderSettings::from_config(&config)
    }

    #[test]
    fn minimal_wireframe() {
        let s = settings("type = \"Wireframe\"\nsize = 256\neye = [10, 0, 0]").unwrap();
        assert_eq!(s.mode, RenderMode::Wireframe);
        assert_eq!(s.size, 256);
        assert_eq!(s.background, Color::zeros());
        assert!(s.clipping.is_none());
        assert!(s.shadow_mask.is_none());
        assert_eq!(s.projection_distance, 1.0);
        assert!(s.multithreading);
        assert_eq!(s.seed, None);
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        assert!(matches!(
            settings("type = \"Raytracing\"\nsize = 10"),
            Err(RenderError::UnknownRenderMode(_))
        ));
    }

    #[test]
    fn missing_eye_is_reported() {
        assert!(matches!(
            settings("type = \"ZBuffering\"\nsize = 10"),
            Err(RenderError::MissingValue { .. })
        ));
        assert!(settings("type = \"2DLSystem\"\nsize = 10").is_ok());
    }

    #[test]
    fn eye_at_origin_is_reported_against_general() {
        let s = settings("type = \"ZBuffering\"\nsize = 10\neye = [0, 0, 0]").unwrap();
        match s.eye_transform() {
            Err(RenderError::MalformedValue { section, key, .. }) => {
                assert_eq!((section.as_str(), key.as_str()), ("General", "eye"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn clipping_and_shadows() {
        let s = settings(
            r#"
            type = "LightedZBuffering"
            size = 100
            eye = [0, 0, 10]
            nrLights = 2
            clipping = true
            viewDirection = [0, 0, -1]
            hfov = 90
            aspectRatio = 1.0
            dNear = 1
            dFar = 100
            shadowEnabled = true
            shadowMask = 512
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(s.nr_lights, 2);
        assert_eq!(s.shadow_mask, Some(512));
        assert_eq!(s.seed, Some(7));
        let frustum = s.frustum().unwrap();
        assert!((frustum.right - 1.0).abs() < 1e-12);

        let eye = s.eye_transform().unwrap();
        let origin = eye.transform_point(&Point3::origin());
        assert!((origin - Point3::new(0.0, 0.0, -10.0)).norm() < 1e-9);
    }
}
