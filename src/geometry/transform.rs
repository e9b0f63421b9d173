use crate::error::{RenderError, Result};
use nalgebra::{Matrix4, Point3, Vector3};

/// 变换矩阵工厂，提供创建各种变换矩阵的静态方法
///
/// 所有矩阵采用 nalgebra 的列向量约定（`M * p`）。行向量链
/// `rotateX · rotateY · rotateZ · scale · translate` 对应列向量形式的
/// `T * S * Rz * Ry * Rx`，见 [`TransformFactory::model`]。
pub struct TransformFactory;

impl TransformFactory {
    /// 创建绕X轴旋转的变换矩阵
    pub fn rotation_x(angle_rad: f64) -> Matrix4<f64> {
        Matrix4::from_euler_angles(angle_rad, 0.0, 0.0)
    }

    /// 创建绕Y轴旋转的变换矩阵
    pub fn rotation_y(angle_rad: f64) -> Matrix4<f64> {
        Matrix4::from_euler_angles(0.0, angle_rad, 0.0)
    }

    /// 创建绕Z轴旋转的变换矩阵
    pub fn rotation_z(angle_rad: f64) -> Matrix4<f64> {
        Matrix4::from_euler_angles(0.0, 0.0, angle_rad)
    }

    /// 创建均匀缩放矩阵
    pub fn scaling(scale: f64) -> Matrix4<f64> {
        Matrix4::new_scaling(scale)
    }

    /// 创建把原点平移到 `center` 的矩阵
    pub fn translation(center: &Point3<f64>) -> Matrix4<f64> {
        Matrix4::new_translation(&center.coords)
    }

    /// 组合单个图形的模型矩阵：先绕X、Y、Z旋转，再缩放，最后平移到中心点
    pub fn model(rotation_rad: &Vector3<f64>, scale: f64, center: &Point3<f64>) -> Matrix4<f64> {
        Self::translation(center)
            * Self::scaling(scale)
            * Self::rotation_z(rotation_rad.z)
            * Self::rotation_y(rotation_rad.y)
            * Self::rotation_x(rotation_rad.x)
    }

    /// 视点变换：相机位于 `eye`，始终看向原点，+Z 为上方向。
    ///
    /// 变换后相机位于原点，看向 -Z；原点映射到 `(0, 0, -r)`。
    pub fn eye_point(eye: &Point3<f64>) -> Result<Matrix4<f64>> {
        let r = eye.coords.norm();
        if r < f64::EPSILON {
            return Err(RenderError::ViewpointAtOrigin);
        }
        let (theta, phi) = spherical_angles(&eye.coords);
        let rotation = eye_rotation(theta, phi);
        Ok(Matrix4::new_translation(&Vector3::new(0.0, 0.0, -r)) * rotation)
    }

    /// 带视线方向的视点变换（裁剪模式）：相机位于 `eye`，沿 `direction` 观察。
    ///
    /// 当 `direction == -eye` 时与 [`TransformFactory::eye_point`] 等价。
    pub fn eye_point_along(eye: &Point3<f64>, direction: &Vector3<f64>) -> Result<Matrix4<f64>> {
        if direction.norm() < f64::EPSILON {
            return Err(RenderError::malformed(
                "General",
                "viewDirection",
                "view direction must not be the zero vector",
            ));
        }
        let (theta, phi) = spherical_angles(&(-direction));
        Ok(eye_rotation(theta, phi) * Matrix4::new_translation(&(-eye.coords)))
    }

    /// 求逆矩阵；奇异矩阵返回错误而不是产生无意义的结果
    pub fn inverse(matrix: &Matrix4<f64>) -> Result<Matrix4<f64>> {
        matrix.try_inverse().ok_or(RenderError::SingularMatrix)
    }
}

/// 向量的球坐标角 (theta, phi)，theta 为XY平面内的方位角，phi 为与+Z轴的夹角
fn spherical_angles(v: &Vector3<f64>) -> (f64, f64) {
    let r = v.norm();
    let theta = v.y.atan2(v.x);
    let phi = (v.z / r).clamp(-1.0, 1.0).acos();
    (theta, phi)
}

fn eye_rotation(theta: f64, phi: f64) -> Matrix4<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    #[rustfmt::skip]
    let rotation = Matrix4::new(
        -sin_t,          cos_t,          0.0,   0.0,
        -cos_t * cos_p, -sin_t * cos_p,  sin_p, 0.0,
         cos_t * sin_p,  sin_t * sin_p,  cos_p, 0.0,
         0.0,            0.0,            0.0,   1.0,
    );
    rotation
}

/// 对点应用齐次变换
#[inline]
pub fn transform_point(point: &Point3<f64>, matrix: &Matrix4<f64>) -> Point3<f64> {
    matrix.transform_point(point)
}

/// 对方向向量应用变换（忽略平移）
#[inline]
pub fn transform_vector(vector: &Vector3<f64>, matrix: &Matrix4<f64>) -> Vector3<f64> {
    matrix.transform_vector(vector)
}
