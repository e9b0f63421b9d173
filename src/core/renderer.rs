//! # 渲染流水线
//!
//! 按渲染模式驱动各阶段：装配场景几何、变换到视点空间、投影与图像适配、
//! 线段或三角形光栅化，最后产出帧缓冲区。
//!
//! | 模式 | 几何 | 输出 |
//! |------|------|------|
//! | `2DLSystem` | 二维海龟线段 | 无深度测试的直线 |
//! | `Wireframe` | 所有图形的边 | 无深度测试的直线 |
//! | `ZBufferedWireframe` | 所有图形的边 | 带深度测试的直线 |
//! | `ZBuffering` | 三角化的实体 + 线条图形 | 平面颜色 |
//! | `LightedZBuffering` | 同上 | Phong 光照与阴影 |

use crate::core::frame_buffer::FrameBuffer;
use crate::core::line_rasterizer::{draw_line, draw_zbuf_line};
use crate::core::projection::{ImageFit, ScreenProjection, project_edges, project_point};
use crate::core::rasterizer::{TriangleData, rasterize_triangles};
use crate::core::shadow_map::ShadowMask;
use crate::error::{RenderError, Result};
use crate::geometry::figure::{Figure, Material};
use crate::geometry::line::Line2D;
use crate::geometry::transform::TransformFactory;
use crate::geometry::triangulate::triangulate;
use crate::io::render_settings::{RenderMode, RenderSettings};
use crate::io::scene_loader::{LSystem2DSpec, LightSpec, SceneDescription};
use crate::lsystem::draw_lsystem_2d;
use crate::material_system::light::Light;
use crate::material_system::shading::shade;
use crate::scene::{SceneAssembler, SceneGeometry};
use log::{debug, info, warn};
use nalgebra::{Matrix4, Point3};
use rand::Rng;
use std::time::Instant;

/// 一次渲染的结果
#[derive(Debug)]
pub struct RenderOutput {
    pub frame: FrameBuffer,
    /// 三角形模式下视点空间到屏幕的投影
    pub projection: Option<ScreenProjection>,
    /// 帧缓冲区的深度是否有意义（Z-缓冲模式）
    pub has_depth: bool,
}

/// 渲染一个场景。没有可见几何（图像尺寸为零）时返回 `Ok(None)`。
pub fn render<R: Rng + ?Sized>(
    scene: &SceneDescription,
    rng: &mut R,
) -> Result<Option<RenderOutput>> {
    let settings = &scene.settings;
    let start = Instant::now();
    info!(
        "渲染模式 {}, 画布 {}, {}",
        settings.mode,
        settings.size,
        if settings.multithreading { "多线程" } else { "单线程" }
    );

    let output = match (settings.mode, &scene.lsystem) {
        (RenderMode::LSystem2D, Some(lsystem)) => render_lsystem_2d(settings, lsystem, rng)?,
        (RenderMode::LSystem2D, None) => None,
        (mode, _) => {
            let geometry = SceneAssembler::assemble(&scene.figures, mode.is_lighted(), rng)?;
            info!(
                "场景装配完成: {} 个实体, {} 个线条图形, 耗时 {:?}",
                geometry.solids.len(),
                geometry.line_drawings.len(),
                start.elapsed()
            );
            if geometry.is_empty() {
                warn!("场景中没有图形");
                None
            } else if mode.is_z_buffered() {
                render_triangles(settings, &geometry, &scene.lights)?
            } else {
                render_wireframe(settings, &geometry)?
            }
        }
    };

    info!("渲染总耗时 {:?}", start.elapsed());
    Ok(output)
}

/// 适配并绘制已投影（缩放前）的线段
fn draw_fitted_lines(
    lines: &[Line2D],
    settings: &RenderSettings,
    z_buffered: bool,
) -> Result<Option<RenderOutput>> {
    let Some(fit) = ImageFit::from_points(
        lines.iter().flat_map(Line2D::endpoints),
        settings.size as f64,
    ) else {
        return Ok(None);
    };

    let mut frame = FrameBuffer::new(fit.width, fit.height, settings.background)?;
    let mut band = frame.full_band();
    for line in lines.iter().map(|l| fit.apply_to_line(l)) {
        match line.depth {
            Some((z1, z2)) if z_buffered => {
                draw_zbuf_line(&mut band, &line.p1, z1, &line.p2, z2, line.color)
            }
            _ => draw_line(&mut band, &line.p1, &line.p2, line.color),
        }
    }
    debug!("绘制 {} 条线段到 {}x{}", lines.len(), fit.width, fit.height);

    Ok(Some(RenderOutput {
        frame,
        projection: None,
        has_depth: z_buffered,
    }))
}

fn render_lsystem_2d<R: Rng + ?Sized>(
    settings: &RenderSettings,
    lsystem: &LSystem2DSpec,
    rng: &mut R,
) -> Result<Option<RenderOutput>> {
    let start = Instant::now();
    let lines = draw_lsystem_2d(&lsystem.grammar, lsystem.color, rng)?;
    info!("L-系统展开为 {} 条线段, 耗时 {:?}", lines.len(), start.elapsed());
    draw_fitted_lines(&lines, settings, false)
}

/// 变换到视点空间的图形副本
fn to_eye_space(figures: &[Figure], eye: &Matrix4<f64>) -> Vec<Figure> {
    figures.iter().map(|f| f.transformed(eye)).collect()
}

fn render_wireframe(
    settings: &RenderSettings,
    geometry: &SceneGeometry,
) -> Result<Option<RenderOutput>> {
    let eye = settings.eye_transform()?;
    let figures: Vec<Figure> = geometry.all_figures().map(|f| f.transformed(&eye)).collect();
    let frustum = settings.frustum();

    let projected = project_edges(&figures, settings.projection_distance, frustum.as_ref());
    if projected.skipped > 0 {
        warn!("跳过 {} 条位于视点平面或其后的线段", projected.skipped);
    }
    draw_fitted_lines(
        &projected.lines,
        settings,
        settings.mode == RenderMode::ZBufferedWireframe,
    )
}

/// 视点空间中的三角形：三个顶点与材质
type EyeTriangle = ([Point3<f64>; 3], Material);

/// 三角化（或裁剪）视点空间实体，收集相机前方的三角形
fn collect_triangles(
    solids: Vec<Figure>,
    settings: &RenderSettings,
) -> Result<(Vec<EyeTriangle>, usize)> {
    let frustum = settings.frustum();
    let mut triangles = Vec::new();
    let mut skipped = 0usize;

    for figure in solids {
        let figure = match &frustum {
            Some(frustum) => frustum.clip_figure(&figure),
            None => {
                let mut figure = figure;
                triangulate(&mut figure)?;
                figure
            }
        };
        for face in figure.faces.iter().filter(|f| f.len() == 3) {
            let corners = [0, 1, 2].map(|i| figure.points[face.indices[i]]);
            if corners.iter().any(|p| p.z >= 0.0) {
                skipped += 1;
                continue;
            }
            triangles.push((corners, figure.material));
        }
    }
    Ok((triangles, skipped))
}

/// 世界空间光源 -> 视点空间光源；启用阴影时为每个点光源生成遮罩
fn prepare_lights(
    settings: &RenderSettings,
    lights: &[LightSpec],
    world_solids: &[Figure],
    eye: &Matrix4<f64>,
) -> Result<Vec<Light>> {
    if !settings.mode.is_lighted() {
        return Ok(vec![Light::unlit()]);
    }

    let mut world_lights: Vec<Light> = lights.iter().map(LightSpec::to_light).collect();
    if let Some(mask_size) = settings.shadow_mask {
        let start = Instant::now();
        let inverse_eye = TransformFactory::inverse(eye)?;
        for (index, light) in world_lights.iter_mut().enumerate() {
            let Some(position) = light.position() else {
                continue;
            };
            let mask = ShadowMask::build(
                world_solids,
                &position,
                &inverse_eye,
                mask_size,
                settings.multithreading,
            )
            .map_err(|e| match e {
                RenderError::ViewpointAtOrigin => RenderError::malformed(
                    &format!("Light{index}"),
                    "location",
                    "a shadow-casting point light must not sit at the origin",
                ),
                other => other,
            })?;
            light.set_shadow_mask(mask);
        }
        info!("阴影遮罩生成耗时 {:?}", start.elapsed());
    }

    Ok(world_lights.iter().map(|l| l.transformed(eye)).collect())
}

fn render_triangles(
    settings: &RenderSettings,
    geometry: &SceneGeometry,
    lights: &[LightSpec],
) -> Result<Option<RenderOutput>> {
    let eye = settings.eye_transform()?;
    let d = settings.projection_distance;

    let start = Instant::now();
    let (corners, skipped) = collect_triangles(to_eye_space(&geometry.solids, &eye), settings)?;
    if skipped > 0 {
        warn!("跳过 {} 个位于视点平面或其后的三角形", skipped);
    }
    let line_figures = to_eye_space(&geometry.line_drawings, &eye);
    let projected = project_edges(&line_figures, d, settings.frustum().as_ref());
    if projected.skipped > 0 {
        warn!("跳过 {} 条位于视点平面或其后的线段", projected.skipped);
    }

    let points = corners
        .iter()
        .flat_map(|(c, _)| c.iter().map(|p| project_point(p, d)))
        .chain(projected.lines.iter().flat_map(Line2D::endpoints));
    let Some(fit) = ImageFit::from_points(points, settings.size as f64) else {
        return Ok(None);
    };
    let projection = fit.screen_projection(d);

    let triangles: Vec<TriangleData> = corners
        .iter()
        .filter_map(|([a, b, c], material)| TriangleData::setup(a, b, c, projection, *material))
        .collect();
    info!(
        "几何处理完成: {} 个三角形, 耗时 {:?}",
        triangles.len(),
        start.elapsed()
    );

    let lights = prepare_lights(settings, lights, &geometry.solids, &eye)?;
    let mut frame = FrameBuffer::new(fit.width, fit.height, settings.background)?;

    let start = Instant::now();
    rasterize_triangles(
        &mut frame,
        &triangles,
        |material, surface| shade(material, &lights, surface),
        settings.multithreading,
    );

    let mut band = frame.full_band();
    for line in projected.lines.iter().map(|l| fit.apply_to_line(l)) {
        if let Some((z1, z2)) = line.depth {
            draw_zbuf_line(&mut band, &line.p1, z1, &line.p2, z2, line.color);
        }
    }
    info!("光栅化完成: {}x{}, 耗时 {:?}", fit.width, fit.height, start.elapsed());

    Ok(Some(RenderOutput {
        frame,
        projection: Some(projection),
        has_depth: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::transform::transform_point;
    use crate::io::config_loader::SceneConfig;
    use crate::lsystem::grammar::tests::koch;
    use crate::material_system::color::Color;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn describe(content: &str) -> SceneDescription {
        let config = SceneConfig::load_from_content(content, ".").unwrap();
        SceneDescription::from_config(&config).unwrap()
    }

    fn render_scene(scene: &SceneDescription) -> Option<RenderOutput> {
        render(scene, &mut StdRng::seed_from_u64(42)).unwrap()
    }

    fn approx_color(a: Color, b: Color, eps: f64) -> bool {
        (a - b).abs().max() <= eps
    }

    /// 世界坐标点所在的像素颜色
    fn color_at(scene: &SceneDescription, output: &RenderOutput, world: Point3<f64>) -> Color {
        let eye = scene.settings.eye_transform().unwrap();
        let projection = output.projection.unwrap();
        let screen = projection.project(&transform_point(&world, &eye));
        output
            .frame
            .pixel(screen.x.round() as usize, screen.y.round() as usize)
    }

    #[test]
    fn unit_cube_renders_centered_flat_silhouette() {
        let scene = describe(
            r#"
            [General]
            type = "ZBuffering"
            size = 100
            eye = [0, 0, 10]
            backgroundcolor = [0, 0, 0.5]
            nrFigures = 1

            [Figure0]
            type = "Cube"
            color = [1, 0, 0]
            "#,
        );
        let output = render_scene(&scene).unwrap();
        let frame = &output.frame;
        assert_eq!((frame.width, frame.height), (100, 100));
        assert!(output.has_depth);

        let red = Color::new(1.0, 0.0, 0.0);
        let background = Color::new(0.0, 0.0, 0.5);
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (usize::MAX, 0, usize::MAX, 0);
        for y in 0..frame.height {
            for x in 0..frame.width {
                let c = frame.pixel(x, y);
                if c == red {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                } else {
                    assert_eq!(c, background, "pixel ({x}, {y})");
                    assert!(frame.depth_buffer[y * frame.width + x].is_infinite());
                }
            }
        }
        assert_eq!(frame.pixel(50, 50), red);
        assert!((min_x + max_x).abs_diff(frame.width - 1) <= 2);
        assert!((min_y + max_y).abs_diff(frame.height - 1) <= 2);
    }

    #[test]
    fn koch_curve_is_drawn_without_depth() {
        let config =
            SceneConfig::load_from_content("[General]\ntype = \"2DLSystem\"\nsize = 100", ".")
                .unwrap();
        let settings = RenderSettings::from_config(&config).unwrap();
        let color = Color::new(0.0, 1.0, 0.0);
        let lsystem = LSystem2DSpec {
            grammar: koch(),
            color,
        };

        let mut rng = StdRng::seed_from_u64(3);
        let lines = draw_lsystem_2d(&lsystem.grammar, color, &mut rng).unwrap();
        assert_eq!(lines.len(), 16);
        // 折线首尾相接
        assert!(lines.windows(2).all(|w| (w[0].p2 - w[1].p1).norm() < 1e-9));

        let scene = SceneDescription {
            settings,
            figures: Vec::new(),
            lights: Vec::new(),
            lsystem: Some(lsystem),
        };
        let output = render_scene(&scene).unwrap();
        assert!(!output.has_depth);
        assert_eq!(output.frame.width, 100);
        assert!(output.frame.height < 50);
        assert!(output.frame.color_buffer.contains(&color));
    }

    fn lighted_cube(direction: [f64; 3]) -> SceneDescription {
        describe(&format!(
            r#"
            [General]
            type = "LightedZBuffering"
            size = 100
            eye = [0, 0, 10]
            nrFigures = 1
            nrLights = 1

            [Figure0]
            type = "Cube"
            diffuseReflection = [0.5, 0.5, 0.5]

            [Light0]
            infinity = true
            direction = {direction:?}
            diffuseLight = [1, 1, 1]
            "#
        ))
    }

    #[test]
    fn diffuse_follows_light_angle() {
        let head_on = render_scene(&lighted_cube([0.0, 0.0, -1.0])).unwrap();
        let center = head_on.frame.pixel(50, 50);
        assert!(approx_color(center, Color::new(0.5, 0.5, 0.5), 1e-9));

        // 光线与法向量成 89°
        let angle = 89f64.to_radians();
        let grazing =
            render_scene(&lighted_cube([-angle.sin(), 0.0, -angle.cos()])).unwrap();
        let center = grazing.frame.pixel(50, 50);
        assert!(center.max() < 0.01);
        assert!(center.min() > 0.0);
    }

    fn shadow_scene(shadows: bool) -> SceneDescription {
        describe(&format!(
            r#"
            [General]
            type = "LightedZBuffering"
            size = 200
            eye = [10, 0, 6]
            nrFigures = 2
            nrLights = 1
            shadowEnabled = {shadows}
            shadowMask = 512

            [Figure0]
            type = "Cube"
            scale = 4
            center = [0, 0, -4]
            ambientReflection = [1, 1, 1]
            diffuseReflection = [1, 1, 1]

            [Figure1]
            type = "Cube"
            center = [0, 0, 3]
            ambientReflection = [1, 1, 1]
            diffuseReflection = [1, 1, 1]

            [Light0]
            location = [0, 0, 10]
            ambientLight = [0.2, 0.2, 0.2]
            diffuseLight = [0.8, 0.8, 0.8]
            "#
        ))
    }

    #[test]
    fn occluder_removes_direct_light_but_keeps_ambient() {
        let lit_scene = shadow_scene(false);
        let shadow_scene = shadow_scene(true);
        let lit = render_scene(&lit_scene).unwrap();
        let shadowed = render_scene(&shadow_scene).unwrap();

        // 遮挡物正下方的地面
        let under = Point3::new(1.3, 0.3, 0.0);
        let ambient = Color::new(0.2, 0.2, 0.2);
        assert!(color_at(&lit_scene, &lit, under).min() > 0.9);
        assert!(approx_color(color_at(&shadow_scene, &shadowed, under), ambient, 1e-9));

        // 遮挡物之外的地面不受影响
        let open = Point3::new(3.0, 3.0, 0.0);
        let expected = color_at(&lit_scene, &lit, open);
        assert!(expected.min() > 0.9);
        assert!(approx_color(color_at(&shadow_scene, &shadowed, open), expected, 1e-9));
    }

    #[test]
    fn shadow_light_at_origin_names_its_section() {
        let scene = describe(
            r#"
            [General]
            type = "LightedZBuffering"
            size = 50
            eye = [10, 0, 6]
            nrFigures = 1
            nrLights = 2
            shadowEnabled = true
            shadowMask = 64

            [Figure0]
            type = "Cube"
            center = [0, 0, -3]

            [Light0]
            ambientLight = [0.2, 0.2, 0.2]

            [Light1]
            location = [0, 0, 0]
            diffuseLight = [1, 1, 1]
            "#,
        );
        let err = render(&scene, &mut StdRng::seed_from_u64(1)).unwrap_err();
        match err {
            RenderError::MalformedValue { section, key, .. } => {
                assert_eq!((section.as_str(), key.as_str()), ("Light1", "location"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn nearer_cube_wins_regardless_of_order() {
        let near = "type = \"Cube\"\ncolor = [1, 0, 0]";
        let far = "type = \"Cube\"\nscale = 2\ncenter = [0, 0, -5]\ncolor = [0, 1, 0]";
        for (first, second) in [(near, far), (far, near)] {
            for multithreading in [true, false] {
                let scene = describe(&format!(
                    "[General]\ntype = \"ZBuffering\"\nsize = 120\neye = [0, 0, 10]\n\
                     nrFigures = 2\nmultithreading = {multithreading}\n\
                     [Figure0]\n{first}\n[Figure1]\n{second}"
                ));
                let output = render_scene(&scene).unwrap();
                let center = color_at(&scene, &output, Point3::new(0.0, 0.0, 1.0));
                assert_eq!(center, Color::new(1.0, 0.0, 0.0));
            }
        }
    }

    #[test]
    fn wireframe_modes_draw_edges() {
        for (mode, depth) in [("Wireframe", false), ("ZBufferedWireframe", true)] {
            let scene = describe(&format!(
                "[General]\ntype = \"{mode}\"\nsize = 64\neye = [5, 4, 3]\nnrFigures = 1\n\
                 [Figure0]\ntype = \"Octahedron\"\ncolor = [1, 1, 1]"
            ));
            let output = render_scene(&scene).unwrap();
            assert_eq!(output.has_depth, depth);
            assert!(output.projection.is_none());
            let white = output
                .frame
                .color_buffer
                .iter()
                .filter(|&&c| c == Color::new(1.0, 1.0, 1.0))
                .count();
            assert!(white > 64);
            assert_eq!(
                output
                    .frame
                    .depth_buffer
                    .iter()
                    .any(|d| d.is_finite()),
                depth
            );
        }
    }

    #[test]
    fn line_drawings_share_the_z_buffer() {
        let scene = describe(
            r#"
            [General]
            type = "ZBuffering"
            size = 100
            eye = [0, 0, 10]
            nrFigures = 2

            [Figure0]
            type = "Cube"
            color = [1, 0, 0]

            [Figure1]
            type = "LineDrawing"
            color = [0, 0, 1]
            nrPoints = 4
            nrLines = 2
            point0 = [-3, 0, 5]
            point1 = [3, 0, 5]
            point2 = [0, -3, -5]
            point3 = [0, 3, -5]
            line0 = [0, 1]
            line1 = [2, 3]
            "#,
        );
        let output = render_scene(&scene).unwrap();
        let blue = Color::new(0.0, 0.0, 1.0);
        // 前方的线压在立方体上，后方的线被立方体挡住
        assert_eq!(color_at(&scene, &output, Point3::new(0.0, 0.0, 5.0)), blue);
        assert_eq!(
            color_at(&scene, &output, Point3::new(0.0, 0.5, 1.0)),
            Color::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn empty_scene_produces_no_image() {
        let scene = describe("[General]\ntype = \"ZBuffering\"\nsize = 100\neye = [0, 0, 10]");
        assert!(render_scene(&scene).is_none());
    }

    #[test]
    fn clipping_keeps_only_geometry_inside_the_frustum() {
        let scene = describe(
            r#"
            [General]
            type = "ZBuffering"
            size = 100
            eye = [0, 0, 10]
            nrFigures = 2
            clipping = true
            viewDirection = [0, 0, -1]
            hfov = 90
            aspectRatio = 1
            dNear = 1
            dFar = 100

            [Figure0]
            type = "Cube"
            color = [1, 0, 0]

            [Figure1]
            type = "Cube"
            center = [0, 0, 20]
            color = [0, 1, 0]
            "#,
        );
        let output = render_scene(&scene).unwrap();
        let green = Color::new(0.0, 1.0, 0.0);
        assert!(!output.frame.color_buffer.contains(&green));
        assert!(output.frame.color_buffer.contains(&Color::new(1.0, 0.0, 0.0)));
    }
}
