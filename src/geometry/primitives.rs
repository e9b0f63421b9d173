//! # 基础几何体
//!
//! 柏拉图立体的静态点/面表，以及按分辨率采样的球、圆锥、圆柱和圆环。
//! 所有面都按逆时针（从外侧看）排列。

use crate::error::{RenderError, Result, try_vec_with_capacity};
use crate::geometry::figure::{Face, Figure};
use nalgebra::Point3;
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

/// 柏拉图立体（及截角二十面体）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatonicSolid {
    Tetrahedron,
    Cube,
    Octahedron,
    Icosahedron,
    Dodecahedron,
    BuckyBall,
}

impl PlatonicSolid {
    pub fn figure(self) -> Figure {
        match self {
            PlatonicSolid::Tetrahedron => tetrahedron(),
            PlatonicSolid::Cube => cube(),
            PlatonicSolid::Octahedron => octahedron(),
            PlatonicSolid::Icosahedron => icosahedron(),
            PlatonicSolid::Dodecahedron => dodecahedron(),
            PlatonicSolid::BuckyBall => bucky_ball(),
        }
    }
}

pub fn cube() -> Figure {
    Figure::from_tables(
        &[
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [1.0, 1.0, 1.0],
            [-1.0, -1.0, 1.0],
            [1.0, 1.0, -1.0],
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ],
        &[
            &[0, 4, 2, 6],
            &[4, 1, 7, 2],
            &[1, 5, 3, 7],
            &[5, 0, 6, 3],
            &[6, 2, 7, 3],
            &[0, 5, 1, 4],
        ],
    )
}

pub fn tetrahedron() -> Figure {
    Figure::from_tables(
        &[
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [1.0, 1.0, 1.0],
            [-1.0, -1.0, 1.0],
        ],
        &[&[0, 1, 2], &[1, 3, 2], &[0, 3, 1], &[0, 2, 3]],
    )
}

pub fn octahedron() -> Figure {
    Figure::from_tables(
        &[
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0, 1.0],
        ],
        &[
            &[0, 1, 5],
            &[1, 2, 5],
            &[2, 3, 5],
            &[3, 0, 5],
            &[1, 0, 4],
            &[2, 1, 4],
            &[3, 2, 4],
            &[0, 3, 4],
        ],
    )
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 1, 2],
    [0, 2, 3],
    [0, 3, 4],
    [0, 4, 5],
    [0, 5, 1],
    [1, 6, 2],
    [2, 6, 7],
    [2, 7, 3],
    [3, 7, 8],
    [3, 8, 4],
    [4, 8, 9],
    [4, 9, 5],
    [5, 9, 10],
    [5, 10, 1],
    [1, 10, 6],
    [11, 7, 6],
    [11, 8, 7],
    [11, 9, 8],
    [11, 10, 9],
    [11, 6, 10],
];

pub fn icosahedron() -> Figure {
    let half_sqrt5 = 5f64.sqrt() / 2.0;
    let mut points = Vec::with_capacity(12);
    points.push(Point3::new(0.0, 0.0, half_sqrt5));
    for i in 0..5 {
        let angle = i as f64 * 2.0 * PI / 5.0;
        points.push(Point3::new(angle.cos(), angle.sin(), 0.5));
    }
    for i in 0..5 {
        let angle = PI / 5.0 + i as f64 * 2.0 * PI / 5.0;
        points.push(Point3::new(angle.cos(), angle.sin(), -0.5));
    }
    points.push(Point3::new(0.0, 0.0, -half_sqrt5));

    let faces = ICOSAHEDRON_FACES
        .iter()
        .map(|f| Face::new(f.to_vec()))
        .collect();
    Figure::new(points, faces)
}

/// 十二面体：顶点是二十面体各面的重心
pub fn dodecahedron() -> Figure {
    const FACES: [[usize; 5]; 12] = [
        [0, 1, 2, 3, 4],
        [0, 5, 6, 7, 1],
        [1, 7, 8, 9, 2],
        [2, 9, 10, 11, 3],
        [3, 11, 12, 13, 4],
        [4, 13, 14, 5, 0],
        [19, 18, 17, 16, 15],
        [19, 14, 13, 12, 18],
        [18, 12, 11, 10, 17],
        [17, 10, 9, 8, 16],
        [16, 8, 7, 6, 15],
        [15, 6, 5, 14, 19],
    ];

    let ico = icosahedron();
    let points = ico
        .faces
        .iter()
        .map(|face| {
            let sum = face
                .indices
                .iter()
                .fold(nalgebra::Vector3::zeros(), |acc, &i| acc + ico.points[i].coords);
            Point3::from(sum / face.len() as f64)
        })
        .collect();
    let faces = FACES.iter().map(|f| Face::new(f.to_vec())).collect();
    Figure::new(points, faces)
}

/// 截角二十面体：每个二十面体面变成六边形，每个顶点变成五边形
pub fn bucky_ball() -> Figure {
    let ico = icosahedron();
    let mut points = Vec::with_capacity(60);
    // (i, j) -> 从顶点 i 指向 j 的棱上 1/3 处的点
    let mut near: HashMap<(usize, usize), usize> = HashMap::new();
    let mut near_point = |i: usize, j: usize, points: &mut Vec<Point3<f64>>| -> usize {
        *near.entry((i, j)).or_insert_with(|| {
            let p = ico.points[i] + (ico.points[j] - ico.points[i]) / 3.0;
            points.push(p);
            points.len() - 1
        })
    };

    let mut faces = Vec::with_capacity(32);
    for &[a, b, c] in &ICOSAHEDRON_FACES {
        let hexagon = vec![
            near_point(a, b, &mut points),
            near_point(b, a, &mut points),
            near_point(b, c, &mut points),
            near_point(c, b, &mut points),
            near_point(c, a, &mut points),
            near_point(a, c, &mut points),
        ];
        faces.push(Face::new(hexagon));
    }

    for vertex in 0..ico.points.len() {
        // 围绕顶点的邻居环：面 (v, x, y) 给出 x -> y
        let next: HashMap<usize, usize> = ICOSAHEDRON_FACES
            .iter()
            .filter_map(|f| {
                let pos = f.iter().position(|&i| i == vertex)?;
                Some((f[(pos + 1) % 3], f[(pos + 2) % 3]))
            })
            .collect();
        let Some(&start) = next.keys().min() else {
            continue;
        };
        let mut pentagon = Vec::with_capacity(next.len());
        let mut current = start;
        for _ in 0..next.len() {
            pentagon.push(near_point(vertex, current, &mut points));
            let Some(&following) = next.get(&current) else {
                break;
            };
            current = following;
        }
        faces.push(Face::new(pentagon));
    }

    Figure::new(points, faces)
}

/// 单位球：二十面体细分 `n` 次后投影到球面
pub fn sphere(n: u32) -> Figure {
    let ico = icosahedron();
    let mut points = ico.points;
    let mut triangles: Vec<[usize; 3]> = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..n {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, points: &mut Vec<Point3<f64>>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = nalgebra::center(&points[a], &points[b]);
                points.push(mid);
                points.len() - 1
            })
        };

        let mut subdivided = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let d = midpoint(a, b, &mut points);
            let e = midpoint(a, c, &mut points);
            let f = midpoint(b, c, &mut points);
            subdivided.extend([[a, d, e], [b, f, d], [c, e, f], [d, f, e]]);
        }
        triangles = subdivided;
    }

    for p in points.iter_mut() {
        *p = Point3::from(p.coords.normalize());
    }
    let faces = triangles.iter().map(|t| Face::new(t.to_vec())).collect();
    Figure::new(points, faces)
}

fn circle_point(i: usize, n: usize, z: f64) -> Point3<f64> {
    let angle = TAU * i as f64 / n as f64;
    Point3::new(angle.cos(), angle.sin(), z)
}

/// 由分辨率参数算出的元素个数，溢出视为资源不足
fn element_count(what: &str, count: Option<usize>) -> Result<usize> {
    count.ok_or_else(|| {
        RenderError::InsufficientResources(format!("{what}: element count overflows"))
    })
}

/// 底面多边形的索引（逆序，法向朝外）
fn reversed_ring(range: std::ops::Range<usize>, what: &str) -> Result<Face> {
    let mut indices = try_vec_with_capacity(range.len(), what)?;
    indices.extend(range.rev());
    Ok(Face::new(indices))
}

/// 圆锥：底面为XY平面上的单位圆（n个采样点），顶点位于 (0, 0, height)
pub fn cone(n: usize, height: f64) -> Result<Figure> {
    let count = element_count("cone", n.checked_add(1))?;

    let mut points = try_vec_with_capacity(count, "cone points")?;
    points.extend((0..n).map(|i| circle_point(i, n, 0.0)));
    points.push(Point3::new(0.0, 0.0, height));

    let mut faces = try_vec_with_capacity(count, "cone faces")?;
    faces.extend((0..n).map(|i| Face::new(vec![i, (i + 1) % n, n])));
    faces.push(reversed_ring(0..n, "cone base")?);
    Ok(Figure::new(points, faces))
}

/// 圆柱：底面 z = 0，顶面 z = height
pub fn cylinder(n: usize, height: f64) -> Result<Figure> {
    let count = element_count("cylinder", n.checked_mul(2))?;

    let mut points = try_vec_with_capacity(count, "cylinder points")?;
    points.extend((0..n).map(|i| circle_point(i, n, 0.0)));
    points.extend((0..n).map(|i| circle_point(i, n, height)));

    let face_count = element_count("cylinder", n.checked_add(2))?;
    let mut faces = try_vec_with_capacity(face_count, "cylinder faces")?;
    faces.extend((0..n).map(|i| {
        let j = (i + 1) % n;
        Face::new(vec![i, j, n + j, n + i])
    }));
    faces.push(reversed_ring(0..n, "cylinder base")?);
    let mut top = try_vec_with_capacity(n, "cylinder top")?;
    top.extend(n..count);
    faces.push(Face::new(top));
    Ok(Figure::new(points, faces))
}

/// 圆环：管半径 `r`，主半径 `big_r`，沿主圆 `n` 段，沿管 `m` 段
pub fn torus(r: f64, big_r: f64, n: usize, m: usize) -> Result<Figure> {
    let count = element_count("torus", n.checked_mul(m))?;
    let index = |i: usize, j: usize| (i % n) * m + (j % m);

    let mut points = try_vec_with_capacity(count, "torus points")?;
    for i in 0..n {
        let u = TAU * i as f64 / n as f64;
        for j in 0..m {
            let v = TAU * j as f64 / m as f64;
            let ring = big_r + r * v.cos();
            points.push(Point3::new(ring * u.cos(), ring * u.sin(), r * v.sin()));
        }
    }

    let mut faces = try_vec_with_capacity(count, "torus faces")?;
    for i in 0..n {
        for j in 0..m {
            faces.push(Face::new(vec![
                index(i, j),
                index(i + 1, j),
                index(i + 1, j + 1),
                index(i, j + 1),
            ]));
        }
    }
    Ok(Figure::new(points, faces))
}
