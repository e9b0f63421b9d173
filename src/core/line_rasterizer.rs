use crate::core::frame_buffer::FrameBand;
use crate::material_system::color::Color;
use nalgebra::Point2;

#[inline]
fn round_pixel(p: &Point2<f64>) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

/// Bresenham 直线，不做深度测试
pub fn draw_line(band: &mut FrameBand, p0: &Point2<f64>, p1: &Point2<f64>, color: Color) {
    let (mut x0, mut y0) = round_pixel(p0);
    let (x1, y1) = round_pixel(p1);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        band.set(x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// 带深度测试的直线：沿主轴逐像素前进，1/z 在屏幕空间线性插值
pub fn draw_zbuf_line(
    band: &mut FrameBand,
    p0: &Point2<f64>,
    z0: f64,
    p1: &Point2<f64>,
    z1: f64,
    color: Color,
) {
    let (x0, y0) = round_pixel(p0);
    let (x1, y1) = round_pixel(p1);
    let steps = (x1 - x0).abs().max((y1 - y0).abs());
    let (inv_z0, inv_z1) = (1.0 / z0, 1.0 / z1);

    if steps == 0 {
        band.write_if_closer(x0, y0, inv_z0.min(inv_z1), || color);
        return;
    }

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = x0 + ((x1 - x0) as f64 * t).round() as i64;
        let y = y0 + ((y1 - y0) as f64 * t).round() as i64;
        let inv_z = (1.0 - t) * inv_z0 + t * inv_z1;
        band.write_if_closer(x, y, inv_z, || color);
    }
}
