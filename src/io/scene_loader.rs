//! # 场景描述
//!
//! 把 [`SceneConfig`] 一次性解析为带类型的场景描述：渲染参数、图形、光源和二维 L-系统。
//! 图形类型字符串在这里被转换为封闭的 [`Primitive`] 枚举，之后的阶段只做穷尽匹配。

use crate::error::{RenderError, Result, try_vec_with_capacity};
use crate::geometry::figure::Material;
use crate::geometry::primitives::PlatonicSolid;
use crate::geometry::transform::TransformFactory;
use crate::io::config_loader::{SceneConfig, Section};
use crate::io::lsystem_loader::load_grammar;
use crate::io::render_settings::{RenderMode, RenderSettings};
use crate::lsystem::LSystemGrammar;
use crate::material_system::color::Color;
use crate::material_system::light::{Light, LightKind};
use log::debug;
use nalgebra::{Matrix4, Point3, Vector3};
use std::path::Path;

/// 图形的几何来源
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Platonic(PlatonicSolid),
    /// 二十面体细分 `n` 次
    Sphere { n: u32 },
    Cone { n: usize, height: f64 },
    Cylinder { n: usize, height: f64 },
    Torus { r: f64, big_r: f64, n: usize, m: usize },
    /// 显式点列表与线（两个或更多索引组成的折线）
    LineDrawing {
        points: Vec<Point3<f64>>,
        lines: Vec<Vec<usize>>,
    },
    LSystem3D { grammar: LSystemGrammar },
}

impl Primitive {
    /// 线条类图形只输出投影线段，不参与三角形光栅化
    pub fn is_line_drawing(&self) -> bool {
        matches!(self, Primitive::LineDrawing { .. } | Primitive::LSystem3D { .. })
    }
}

/// 图形的模型变换参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureTransform {
    /// 绕 X、Y、Z 轴的旋转角（度）
    pub rotation: Vector3<f64>,
    pub scale: f64,
    pub center: Point3<f64>,
}

impl Default for FigureTransform {
    fn default() -> Self {
        Self {
            rotation: Vector3::zeros(),
            scale: 1.0,
            center: Point3::origin(),
        }
    }
}

impl FigureTransform {
    pub fn matrix(&self) -> Matrix4<f64> {
        TransformFactory::model(
            &self.rotation.map(f64::to_radians),
            self.scale,
            &self.center,
        )
    }
}

/// 分形参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalSpec {
    pub iterations: u32,
    pub scale: f64,
}

/// 一个 `[FigureN]` 节
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSpec {
    pub name: String,
    pub primitive: Primitive,
    pub transform: FigureTransform,
    /// 平面颜色（非光照模式）
    pub color: Color,
    pub material: Material,
    pub fractal: Option<FractalSpec>,
}

/// 光源来源（世界空间）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    Ambient,
    Infinite { direction: Vector3<f64> },
    Point {
        location: Point3<f64>,
        /// 聚光角（度），0 表示不限制
        spot_angle: f64,
    },
}

/// 一个 `[LightN]` 节
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpec {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub source: LightSource,
}

impl LightSpec {
    /// 世界空间的光源
    pub fn to_light(&self) -> Light {
        let kind = match self.source {
            LightSource::Ambient => LightKind::Ambient,
            LightSource::Infinite { direction } => LightKind::Infinite { direction },
            LightSource::Point {
                location,
                spot_angle,
            } => LightKind::Point {
                position: location,
                spot_angle: (spot_angle > 0.0).then(|| spot_angle.to_radians()),
                shadow: None,
            },
        };
        Light {
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            kind,
        }
    }
}

/// `[2DLSystem]` 节
#[derive(Debug, Clone, PartialEq)]
pub struct LSystem2DSpec {
    pub grammar: LSystemGrammar,
    pub color: Color,
}

/// 完整的场景描述
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescription {
    pub settings: RenderSettings,
    pub figures: Vec<FigureSpec>,
    pub lights: Vec<LightSpec>,
    pub lsystem: Option<LSystem2DSpec>,
}

impl SceneDescription {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_config(&SceneConfig::load_from_file(path)?)
    }

    pub fn from_config(config: &SceneConfig) -> Result<Self> {
        let settings = RenderSettings::from_config(config)?;

        if settings.mode == RenderMode::LSystem2D {
            let section = config.section("2DLSystem");
            let grammar = load_grammar(config.resolve_path(section.required_string("inputfile")?))?;
            let color = section.color_or("color", Color::zeros())?;
            return Ok(Self {
                settings,
                figures: Vec::new(),
                lights: Vec::new(),
                lsystem: Some(LSystem2DSpec { grammar, color }),
            });
        }

        let figures = (0..settings.nr_figures)
            .map(|i| parse_figure(config, &format!("Figure{i}")))
            .collect::<Result<Vec<_>>>()?;
        let lights = (0..settings.nr_lights)
            .map(|i| parse_light(&config.section(&format!("Light{i}"))))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "场景描述: 模式 {}, {} 个图形, {} 个光源",
            settings.mode,
            figures.len(),
            lights.len()
        );

        Ok(Self {
            settings,
            figures,
            lights,
            lsystem: None,
        })
    }
}

fn platonic(name: &str) -> Option<PlatonicSolid> {
    Some(match name {
        "Tetrahedron" => PlatonicSolid::Tetrahedron,
        "Cube" => PlatonicSolid::Cube,
        "Octahedron" => PlatonicSolid::Octahedron,
        "Icosahedron" => PlatonicSolid::Icosahedron,
        "Dodecahedron" => PlatonicSolid::Dodecahedron,
        "BuckyBall" => PlatonicSolid::BuckyBall,
        _ => return None,
    })
}

/// 至少为 `min` 的计数
fn count_at_least(section: &Section, key: &str, min: usize) -> Result<usize> {
    let value = section.required_count(key)?;
    if value < min {
        return Err(RenderError::malformed(
            section.name(),
            key,
            format!("must be at least {min}, got {value}"),
        ));
    }
    Ok(value)
}

fn parse_line_drawing(section: &Section) -> Result<Primitive> {
    let nr_points = section.required_count("nrPoints")?;
    let nr_lines = section.required_count("nrLines")?;

    let mut points = try_vec_with_capacity(nr_points, "line drawing points")?;
    for j in 0..nr_points {
        points.push(section.required_point3(&format!("point{j}"))?);
    }

    let mut lines = try_vec_with_capacity(nr_lines, "line drawing lines")?;
    for j in 0..nr_lines {
        let key = format!("line{j}");
        let indices = section.required_int_tuple(&key)?;
        if indices.len() < 2 {
            return Err(RenderError::malformed(
                section.name(),
                &key,
                "a line needs at least two point indices",
            ));
        }
        let indices = indices
            .into_iter()
            .map(|i| {
                usize::try_from(i)
                    .ok()
                    .filter(|&i| i < nr_points)
                    .ok_or_else(|| {
                        RenderError::malformed(
                            section.name(),
                            &key,
                            format!("point index {i} out of range 0..{nr_points}"),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        lines.push(indices);
    }
    Ok(Primitive::LineDrawing { points, lines })
}

fn parse_primitive(config: &SceneConfig, section: &Section, figure_type: &str) -> Result<Primitive> {
    let base = figure_type.strip_prefix("Fractal").unwrap_or(figure_type);
    if let Some(solid) = platonic(base) {
        return Ok(Primitive::Platonic(solid));
    }

    match figure_type {
        "Sphere" => {
            let n = section.required_count("n")?;
            let n = u32::try_from(n)
                .map_err(|_| RenderError::malformed(section.name(), "n", "too many subdivisions"))?;
            Ok(Primitive::Sphere { n })
        }
        "Cone" => Ok(Primitive::Cone {
            n: count_at_least(section, "n", 3)?,
            height: section.required_float("height")?,
        }),
        "Cylinder" => Ok(Primitive::Cylinder {
            n: count_at_least(section, "n", 3)?,
            height: section.required_float("height")?,
        }),
        "Torus" => Ok(Primitive::Torus {
            r: section.required_float("r")?,
            big_r: section.required_float("R")?,
            n: count_at_least(section, "n", 3)?,
            m: count_at_least(section, "m", 3)?,
        }),
        "LineDrawing" => parse_line_drawing(section),
        "3DLSystem" => {
            let path = config.resolve_path(section.required_string("inputfile")?);
            Ok(Primitive::LSystem3D {
                grammar: load_grammar(path)?,
            })
        }
        other => Err(RenderError::UnknownFigureType {
            section: section.name().to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_figure(config: &SceneConfig, name: &str) -> Result<FigureSpec> {
    let section = config.section(name);
    let figure_type = section.required_string("type")?;
    let primitive = parse_primitive(config, &section, figure_type)?;

    let fractal = if figure_type.starts_with("Fractal") {
        let iterations = section.required_count("nrIterations")?;
        Some(FractalSpec {
            iterations: u32::try_from(iterations).map_err(|_| {
                RenderError::malformed(name, "nrIterations", "too many iterations")
            })?,
            scale: section.required_float("fractalScale")?,
        })
    } else {
        None
    };

    let transform = FigureTransform {
        rotation: Vector3::new(
            section.float_or("rotateX", 0.0)?,
            section.float_or("rotateY", 0.0)?,
            section.float_or("rotateZ", 0.0)?,
        ),
        scale: section.float_or("scale", 1.0)?,
        center: section.point3_or("center", Point3::origin())?,
    };

    let material = Material {
        ambient: section.color_or("ambientReflection", Color::zeros())?,
        diffuse: section.color_or("diffuseReflection", Color::zeros())?,
        specular: section.color_or("specularReflection", Color::zeros())?,
        reflection_coefficient: section.float_or("reflectionCoefficient", 0.0)?,
    };

    Ok(FigureSpec {
        name: name.to_string(),
        primitive,
        transform,
        color: section.color_or("color", Color::zeros())?,
        material,
        fractal,
    })
}

fn parse_light(section: &Section) -> Result<LightSpec> {
    let source = if section.bool_or("infinity", false)? {
        LightSource::Infinite {
            direction: section.required_vector3("direction")?,
        }
    } else if section.contains("location") {
        LightSource::Point {
            location: section.required_point3("location")?,
            spot_angle: section.float_or("spotAngle", 0.0)?,
        }
    } else {
        LightSource::Ambient
    };

    Ok(LightSpec {
        ambient: section.color_or("ambientLight", Color::zeros())?,
        diffuse: section.color_or("diffuseLight", Color::zeros())?,
        specular: section.color_or("specularLight", Color::zeros())?,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(content: &str) -> Result<SceneDescription> {
        SceneDescription::from_config(&SceneConfig::load_from_content(content, ".")?)
    }

    #[test]
    fn parses_figures_and_lights() {
        let scene = describe(
            r#"
            [General]
            type = "LightedZBuffering"
            size = 256
            eye = [10, 10, 10]
            nrFigures = 3
            nrLights = 3

            [Figure0]
            type = "Cube"
            rotateZ = 45
            scale = 2
            center = [0, 0, 1]
            color = [1, 0, 0]
            diffuseReflection = [0.5, 0.5, 0.5]
            reflectionCoefficient = 20

            [Figure1]
            type = "FractalTetrahedron"
            nrIterations = 2
            fractalScale = 3

            [Figure2]
            type = "LineDrawing"
            nrPoints = 3
            nrLines = 2
            point0 = [0, 0, 0]
            point1 = [1, 0, 0]
            point2 = [1, 1, 0]
            line0 = [0, 1]
            line1 = [1, 2, 0]

            [Light0]
            ambientLight = [0.2, 0.2, 0.2]

            [Light1]
            infinity = true
            direction = [-1, -1, -1]
            diffuseLight = [1, 1, 1]

            [Light2]
            location = [0, 0, 5]
            spotAngle = 30
            "#,
        )
        .unwrap();

        assert_eq!(scene.figures.len(), 3);
        let cube = &scene.figures[0];
        assert_eq!(cube.primitive, Primitive::Platonic(PlatonicSolid::Cube));
        assert_eq!(cube.transform.rotation, Vector3::new(0.0, 0.0, 45.0));
        assert_eq!(cube.transform.scale, 2.0);
        assert_eq!(cube.material.diffuse, Color::new(0.5, 0.5, 0.5));
        assert_eq!(cube.material.reflection_coefficient, 20.0);
        assert!(cube.fractal.is_none());

        assert_eq!(
            scene.figures[1].fractal,
            Some(FractalSpec {
                iterations: 2,
                scale: 3.0
            })
        );
        assert!(scene.figures[2].primitive.is_line_drawing());

        assert_eq!(scene.lights[0].source, LightSource::Ambient);
        assert!(matches!(scene.lights[1].source, LightSource::Infinite { .. }));
        let spot = scene.lights[2].to_light();
        match spot.kind {
            LightKind::Point { spot_angle, .. } => {
                assert!((spot_angle.unwrap() - 30f64.to_radians()).abs() < 1e-12)
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_figure_type_is_a_configuration_error() {
        let err = describe(
            r#"
            [General]
            type = "Wireframe"
            size = 100
            eye = [1, 1, 1]
            nrFigures = 1
            [Figure0]
            type = "Teapot"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnknownFigureType { .. }));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let base = "[General]\ntype = \"Wireframe\"\nsize = 100\neye = [1, 1, 1]\nnrFigures = 1\n[Figure0]\n";
        assert!(matches!(
            describe(&format!("{base}type = \"Cone\"\nn = 2\nheight = 1.0")),
            Err(RenderError::MalformedValue { .. })
        ));
        assert!(matches!(
            describe(&format!("{base}type = \"Torus\"\nr = 0.2\nR = 1\nn = 12")),
            Err(RenderError::MissingValue { .. })
        ));
        assert!(matches!(
            describe(&format!(
                "{base}type = \"LineDrawing\"\nnrPoints = 1\nnrLines = 1\npoint0 = [0, 0, 0]\nline0 = [0, 1]"
            )),
            Err(RenderError::MalformedValue { .. })
        ));
        assert!(matches!(
            describe(&format!("{base}type = \"FractalCube\"\nfractalScale = 2")),
            Err(RenderError::MissingValue { .. })
        ));
    }

    #[test]
    fn oversized_line_drawing_is_resource_exhaustion() {
        let err = describe(
            r#"
            [General]
            type = "Wireframe"
            size = 100
            eye = [1, 1, 1]
            nrFigures = 1
            [Figure0]
            type = "LineDrawing"
            nrPoints = 0
            nrLines = 1000000000000000
            "#,
        )
        .unwrap_err();
        assert!(err.is_resource_exhaustion(), "{err}");
    }

    #[test]
    fn lights_are_ignored_without_lighting() {
        let scene = describe(
            r#"
            [General]
            type = "ZBuffering"
            size = 100
            eye = [1, 1, 1]
            nrLights = 1
            [Light0]
            location = "bad"
            "#,
        )
        .unwrap();
        assert!(scene.lights.is_empty());
        assert!(scene.figures.is_empty());
    }
}
