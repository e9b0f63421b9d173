use nalgebra::Vector3;

/// RGB颜色，分量范围 [0.0, 1.0]
pub type Color = Vector3<f64>;

/// 将颜色各通道限制到 [0, 1]
pub fn clamp_color(color: &Color) -> Color {
    color.map(|c| c.clamp(0.0, 1.0))
}

/// 将线性RGB值转换为u8数组
///
/// # Arguments
/// * `color` - RGB颜色值，超出 [0.0-1.0] 的部分会被截断
///
/// # Returns
/// 一个包含三个u8值的数组，表示颜色的RGB通道
pub fn rgb_to_u8(color: &Color) -> [u8; 3] {
    let c = clamp_color(color);
    [
        (c.x * 255.0).round() as u8,
        (c.y * 255.0).round() as u8,
        (c.z * 255.0).round() as u8,
    ]
}

/// Converts a normalized depth map (values 0.0-1.0) into an RGB color image
/// using the JET colormap.
///
/// Invalid depth values (NaN, Infinity) will result in black pixels.
pub fn apply_colormap_jet(normalized_depth: &[f64]) -> Vec<[u8; 3]> {
    normalized_depth
        .iter()
        .map(|&depth| {
            if !depth.is_finite() {
                return [0, 0, 0];
            }
            let value = depth.clamp(0.0, 1.0);
            let (r, g, b) = if value <= 0.25 {
                // Blue to Cyan
                (0.0, value * 4.0, 1.0)
            } else if value <= 0.5 {
                // Cyan to Green
                (0.0, 1.0, 1.0 - (value - 0.25) * 4.0)
            } else if value <= 0.75 {
                // Green to Yellow
                ((value - 0.5) * 4.0, 1.0, 0.0)
            } else {
                // Yellow to Red
                (1.0, 1.0 - (value - 0.75) * 4.0, 0.0)
            };
            rgb_to_u8(&Color::new(r, g, b))
        })
        .collect()
}
