use crate::error::{RenderError, Result};
use crate::geometry::figure::{Face, Figure, Material};
use crate::geometry::fractal::generate_fractal;
use crate::geometry::primitives::{cone, cylinder, sphere, torus};
use crate::io::scene_loader::{FigureSpec, Primitive};
use crate::lsystem::draw_lsystem_3d;
use log::debug;
use rand::Rng;

/// 球面细分次数上限（20·4^n 个三角形），超过时视为资源不足
const MAX_SPHERE_SUBDIVISIONS: u32 = 10;

/// 装配完成的世界空间几何
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGeometry {
    /// 以三角形光栅化的实体图形
    pub solids: Vec<Figure>,
    /// 只输出线段的线条图形
    pub line_drawings: Vec<Figure>,
}

impl SceneGeometry {
    pub fn is_empty(&self) -> bool {
        self.solids.is_empty() && self.line_drawings.is_empty()
    }

    /// 所有图形，实体在前
    pub fn all_figures(&self) -> impl Iterator<Item = &Figure> {
        self.solids.iter().chain(&self.line_drawings)
    }
}

/// 场景装配器：逐个加入图形描述，最后产出 [`SceneGeometry`]
#[derive(Debug)]
pub struct SceneAssembler {
    lighting: bool,
    geometry: SceneGeometry,
}

impl SceneAssembler {
    pub fn new(lighting: bool) -> Self {
        Self {
            lighting,
            geometry: SceneGeometry::default(),
        }
    }

    /// 生成基础几何
    fn base_figure<R: Rng + ?Sized>(spec: &FigureSpec, rng: &mut R) -> Result<Figure> {
        let figure = match &spec.primitive {
            Primitive::Platonic(solid) => solid.figure(),
            Primitive::Sphere { n } => {
                if *n > MAX_SPHERE_SUBDIVISIONS {
                    return Err(RenderError::InsufficientResources(format!(
                        "sphere with {n} subdivisions in [{}]",
                        spec.name
                    )));
                }
                sphere(*n)
            }
            Primitive::Cone { n, height } => cone(*n, *height)?,
            Primitive::Cylinder { n, height } => cylinder(*n, *height)?,
            Primitive::Torus { r, big_r, n, m } => torus(*r, *big_r, *n, *m)?,
            Primitive::LineDrawing { points, lines } => Figure::new(
                points.clone(),
                lines.iter().map(|l| Face::new(l.clone())).collect(),
            ),
            Primitive::LSystem3D { grammar } => draw_lsystem_3d(grammar, spec.color, rng)?,
        };
        figure.validate()?;
        Ok(figure)
    }

    /// 加入一个图形：生成几何、分形展开、模型变换、材质赋值
    pub fn add<R: Rng + ?Sized>(&mut self, spec: &FigureSpec, rng: &mut R) -> Result<&mut Self> {
        let base = Self::base_figure(spec, rng)?;
        let mut figures = match spec.fractal {
            Some(fractal) => generate_fractal(&base, fractal.iterations, fractal.scale)?,
            None => vec![base],
        };

        let matrix = spec.transform.matrix();
        let material = if self.lighting {
            spec.material
        } else {
            Material::unlit(spec.color)
        };
        for figure in &mut figures {
            figure.apply_transform(&matrix);
            figure.material = material;
            figure.color = spec.color;
        }

        debug!("[{}] 装配 {} 个图形", spec.name, figures.len());
        let target = if spec.primitive.is_line_drawing() {
            &mut self.geometry.line_drawings
        } else {
            &mut self.geometry.solids
        };
        target
            .try_reserve(figures.len())
            .map_err(|e| RenderError::allocation("scene figures", e))?;
        target.extend(figures);
        Ok(self)
    }

    pub fn finish(self) -> SceneGeometry {
        self.geometry
    }

    /// 依次装配所有图形
    pub fn assemble<R: Rng + ?Sized>(
        specs: &[FigureSpec],
        lighting: bool,
        rng: &mut R,
    ) -> Result<SceneGeometry> {
        let mut assembler = Self::new(lighting);
        for spec in specs {
            assembler.add(spec, rng)?;
        }
        Ok(assembler.finish())
    }
}
