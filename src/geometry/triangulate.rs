use crate::error::{RenderError, Result};
use crate::geometry::figure::{Face, Figure};

/// 扇形三角化：面 (i0, i1, ..., in) 拆成 (i0, ik+1, ik+2)
pub fn triangulate_face(face: &Face) -> impl Iterator<Item = Face> + '_ {
    let first = face.indices.first().copied().unwrap_or_default();
    (0..face.len().saturating_sub(2))
        .map(move |i| Face::new(vec![first, face.indices[i + 1], face.indices[i + 2]]))
}

/// 将图形的所有面替换为三角形；少于3个顶点的面违反前置条件
pub fn triangulate(figure: &mut Figure) -> Result<()> {
    if let Some((face, len)) = figure
        .faces
        .iter()
        .enumerate()
        .find(|(_, f)| f.len() < 3)
        .map(|(i, f)| (i, f.len()))
    {
        return Err(RenderError::DegenerateFace { face, len });
    }

    let triangles: Vec<Face> = figure.faces.iter().flat_map(triangulate_face).collect();
    figure.faces = triangles;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::f64::consts::TAU;

    fn polygon_area(points: &[Point3<f64>], indices: &[usize]) -> f64 {
        let n = indices.len();
        (0..n)
            .map(|i| {
                let a = points[indices[i]];
                let b = points[indices[(i + 1) % n]];
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            .abs()
            / 2.0
    }

    #[test]
    fn convex_polygon_becomes_n_minus_two_triangles_with_same_area() {
        for n in 3..10 {
            let points: Vec<_> = (0..n)
                .map(|i| {
                    let a = TAU * i as f64 / n as f64;
                    Point3::new(2.0 * a.cos(), a.sin(), 0.0)
                })
                .collect();
            let indices: Vec<usize> = (0..n).collect();
            let mut figure = Figure::new(points.clone(), vec![Face::new(indices.clone())]);

            triangulate(&mut figure).unwrap();

            assert_eq!(figure.faces.len(), n - 2);
            assert!(figure.faces.iter().all(|f| f.len() == 3));
            let total: f64 = figure
                .faces
                .iter()
                .map(|f| polygon_area(&points, &f.indices))
                .sum();
            assert!((total - polygon_area(&points, &indices)).abs() < 1e-9);
        }
    }

    #[test]
    fn fan_shares_first_vertex() {
        let face = Face::new(vec![4, 5, 6, 7, 8]);
        let triangles: Vec<_> = triangulate_face(&face).map(|f| f.indices).collect();
        assert_eq!(triangles, vec![vec![4, 5, 6], vec![4, 6, 7], vec![4, 7, 8]]);
    }

    #[test]
    fn triangles_pass_through_unchanged() {
        let mut figure = crate::geometry::primitives::tetrahedron();
        let before = figure.faces.clone();
        triangulate(&mut figure).unwrap();
        assert_eq!(figure.faces, before);
    }

    #[test]
    fn line_faces_are_rejected() {
        let mut figure = Figure::new(vec![Point3::origin(); 2], vec![Face::new(vec![0, 1])]);
        assert!(matches!(
            triangulate(&mut figure),
            Err(RenderError::DegenerateFace { face: 0, len: 2 })
        ));
    }
}
