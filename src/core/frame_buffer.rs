use crate::error::{Result, try_filled_vec};
use crate::material_system::color::{Color, rgb_to_u8};
use image::{Rgb, RgbImage};

/// 帧缓冲区实现，存储渲染结果
///
/// 坐标系 y 轴向上：第0行是图像最底部一行，导出时翻转。
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    /// 每像素颜色，分量范围 [0, 1]
    pub color_buffer: Vec<Color>,
    /// 每像素 1/z（z 为视点空间深度，始终为负），初始为 +inf，越小越近
    pub depth_buffer: Vec<f64>,
}

/// 帧缓冲区中连续若干行的可变视图，光栅化的基本工作单元
#[derive(Debug)]
pub struct FrameBand<'a> {
    /// 视图第一行在整幅图像中的行号
    pub first_row: usize,
    pub width: usize,
    color: &'a mut [Color],
    depth: &'a mut [f64],
}

impl FrameBuffer {
    /// 创建以背景色填充的帧缓冲区；大尺寸分配失败时返回资源不足
    pub fn new(width: usize, height: usize, background: Color) -> Result<Self> {
        let num_pixels = width.checked_mul(height).unwrap_or(usize::MAX);
        let color_buffer = try_filled_vec(num_pixels, background, "color buffer")?;
        let depth_buffer = try_filled_vec(num_pixels, f64::INFINITY, "z-buffer")?;
        Ok(FrameBuffer {
            width,
            height,
            color_buffer,
            depth_buffer,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        self.color_buffer[y * self.width + x]
    }

    /// 覆盖整幅图像的单个视图
    pub fn full_band(&mut self) -> FrameBand<'_> {
        FrameBand {
            first_row: 0,
            width: self.width,
            color: &mut self.color_buffer,
            depth: &mut self.depth_buffer,
        }
    }

    /// 按 `rows_per_band` 行切分为互不重叠的视图，可交给不同线程
    pub fn bands_mut(&mut self, rows_per_band: usize) -> Vec<FrameBand<'_>> {
        let width = self.width;
        let chunk = width.max(1) * rows_per_band.max(1);
        self.color_buffer
            .chunks_mut(chunk)
            .zip(self.depth_buffer.chunks_mut(chunk))
            .enumerate()
            .map(|(i, (color, depth))| FrameBand {
                first_row: i * rows_per_band.max(1),
                width,
                color,
                depth,
            })
            .collect()
    }

    /// 转换为图像（翻转 y 轴）
    pub fn to_image(&self) -> RgbImage {
        let (width, height) = (self.width as u32, self.height as u32);
        RgbImage::from_fn(width, height, |x, y| {
            let row = (height - 1 - y) as usize;
            Rgb(rgb_to_u8(&self.pixel(x as usize, row)))
        })
    }

    /// 视点空间距离（-z），未写入的像素为 +inf
    pub fn distance_buffer(&self) -> Vec<f64> {
        self.depth_buffer
            .iter()
            .map(|&inv_z| {
                if inv_z.is_finite() && inv_z != 0.0 {
                    -1.0 / inv_z
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    }
}

impl FrameBand<'_> {
    /// 视图覆盖的行数
    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.color.len() / self.width
        }
    }

    /// 视图覆盖的行号范围 `[start, end)`
    pub fn row_range(&self) -> (i64, i64) {
        let start = self.first_row as i64;
        (start, start + self.rows() as i64)
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let (start, end) = self.row_range();
        if x < 0 || x >= self.width as i64 || y < start || y >= end {
            return None;
        }
        Some((y - start) as usize * self.width + x as usize)
    }

    /// 直接写入颜色（不做深度测试），越界时忽略
    #[inline]
    pub fn set(&mut self, x: i64, y: i64, color: Color) {
        if let Some(index) = self.index(x, y) {
            self.color[index] = color;
        }
    }

    /// 深度测试：`inv_z` 比已有值更小（更近）时更新深度，并用 `shade` 的结果写入颜色
    #[inline]
    pub fn write_if_closer<F>(&mut self, x: i64, y: i64, inv_z: f64, shade: F) -> bool
    where
        F: FnOnce() -> Color,
    {
        match self.index(x, y) {
            Some(index) if inv_z < self.depth[index] => {
                self.depth[index] = inv_z;
                self.color[index] = shade();
                true
            }
            _ => false,
        }
    }
}
