// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/visualizer.rs - 检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detector::Detection;

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_OFFSET: i32 = 20;

/// 可视化工具
///
/// 在原始帧上绘制边界框和类别标签文本。
pub struct Visualizer {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
  /// 每个类别一个固定颜色
  colors: Vec<Rgb<u8>>,
}

impl Visualizer {
  /// 创建可视化工具，为每个类别生成一个确定的颜色
  pub fn new(num_classes: usize) -> Self {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载内置字体");

    let num_colors = num_classes.max(1);
    let colors = (0..num_colors)
      .map(|i| {
        let hue = (i as f32 / num_colors as f32) * 360.0;
        Self::hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      colors,
    }
  }

  /// HSV 转 RGB
  fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
      (c, x, 0.0)
    } else if h < 120.0 {
      (x, c, 0.0)
    } else if h < 180.0 {
      (0.0, c, x)
    } else if h < 240.0 {
      (0.0, x, c)
    } else if h < 300.0 {
      (x, 0.0, c)
    } else {
      (c, 0.0, x)
    };

    Rgb([
      ((r + m) * 255.0) as u8,
      ((g + m) * 255.0) as u8,
      ((b + m) * 255.0) as u8,
    ])
  }

  /// 在图像上绘制检测结果
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      let color = self.colors[detection.class_id % self.colors.len()];

      let x = detection.x.max(0.0) as i32;
      let y = detection.y.max(0.0) as i32;
      let width = detection.width.min(image.width() as f32 - detection.x.max(0.0)) as u32;
      let height = detection.height.min(image.height() as f32 - detection.y.max(0.0)) as u32;

      if width > 0 && height > 0 {
        let rect = Rect::at(x, y).of_size(width, height);
        draw_hollow_rect_mut(image, rect, color);

        // 第二圈边框增加可见度
        if width > 2 && height > 2 {
          let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
          draw_hollow_rect_mut(image, inner, color);
        }
      }

      let label = format!("{}: {:.2}", detection.class_name, detection.confidence);
      let text_y = (y - LABEL_TEXT_OFFSET).max(0);
      draw_text_mut(image, color, x, text_y, self.font_scale, &self.font, &label);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection {
      x,
      y,
      width: w,
      height: h,
      confidence: 0.9,
      class_id: 0,
      class_name: "person".to_string(),
    }
  }

  #[test]
  fn draws_box_on_frame() {
    let visualizer = Visualizer::new(3);
    let mut image = RgbImage::new(64, 64);
    visualizer.draw_detections(&mut image, &[detection(16.0, 16.0, 32.0, 32.0)]);

    // 边框左上角像素被染色
    assert_ne!(*image.get_pixel(16, 16), Rgb([0, 0, 0]));
    // 框内部不填充
    assert_eq!(*image.get_pixel(32, 32), Rgb([0, 0, 0]));
  }

  #[test]
  fn out_of_frame_box_does_not_panic() {
    let visualizer = Visualizer::new(1);
    let mut image = RgbImage::new(64, 64);
    visualizer.draw_detections(&mut image, &[detection(-10.0, -10.0, 200.0, 200.0)]);
  }
}
