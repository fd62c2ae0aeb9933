// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/preprocess.rs - 帧预处理
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

use image::RgbImage;
use image::imageops::FilterType;

/// 模型默认输入宽度
pub const INPUT_WIDTH: u32 = 640;
/// 模型默认输入高度
pub const INPUT_HEIGHT: u32 = 640;

const RGB_CHANNELS: usize = 3;

/// 模型输入张量
///
/// 归一化到 [0,1] 的浮点序列，平面布局（CHW），
/// 长度恒为 3 × height × width。
#[derive(Clone, Debug)]
pub struct InputTensor {
  data: Box<[f32]>,
  width: u32,
  height: u32,
}

impl InputTensor {
  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }
}

/// 预处理一帧图像
///
/// 双线性插值缩放到目标尺寸（各向异性，不做信箱填充），
/// 像素值除以 255 归一化到 [0,1]，并从逐像素交错布局
/// 转为逐通道平面布局，通道内保持行主序。
///
/// 纯函数：相同输入总是产生逐位相同的输出。
pub fn prepare(image: &RgbImage, target_width: u32, target_height: u32) -> InputTensor {
  let resized = image::imageops::resize(image, target_width, target_height, FilterType::Triangle);

  let width = target_width as usize;
  let height = target_height as usize;
  let plane = width * height;
  let mut data = vec![0.0f32; RGB_CHANNELS * plane];

  for (x, y, pixel) in resized.enumerate_pixels() {
    let idx = y as usize * width + x as usize;
    data[idx] = pixel[0] as f32 / 255.0;
    data[plane + idx] = pixel[1] as f32 / 255.0;
    data[2 * plane + idx] = pixel[2] as f32 / 255.0;
  }

  InputTensor {
    data: data.into_boxed_slice(),
    width: target_width,
    height: target_height,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn solid_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
  }

  #[test]
  fn output_has_fixed_shape_and_range() {
    let image = solid_image(1280, 720, [13, 87, 250]);
    let tensor = prepare(&image, INPUT_WIDTH, INPUT_HEIGHT);

    assert_eq!(tensor.len(), 3 * 640 * 640);
    assert_eq!(tensor.width(), 640);
    assert_eq!(tensor.height(), 640);
    assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn channels_are_planar() {
    // 每个通道取不同常量，缩放后各平面仍为对应常量
    let image = solid_image(32, 16, [255, 0, 102]);
    let tensor = prepare(&image, 8, 8);
    let plane = 8 * 8;
    let data = tensor.as_slice();

    for idx in 0..plane {
      assert!((data[idx] - 1.0).abs() < 1e-5);
      assert!(data[plane + idx].abs() < 1e-5);
      assert!((data[2 * plane + idx] - 102.0 / 255.0).abs() < 1e-5);
    }
  }

  #[test]
  fn rows_are_major_within_plane() {
    // 上半白下半黑的图像，不缩放时平面内按行主序排列
    let mut image = solid_image(4, 4, [0, 0, 0]);
    for x in 0..4 {
      for y in 0..2 {
        image.put_pixel(x, y, Rgb([255, 255, 255]));
      }
    }
    let tensor = prepare(&image, 4, 4);
    let data = tensor.as_slice();

    // 红色平面前两行为 1.0，后两行为 0.0
    for idx in 0..8 {
      assert!((data[idx] - 1.0).abs() < 1e-5);
    }
    for idx in 8..16 {
      assert!(data[idx].abs() < 1e-5);
    }
  }

  #[test]
  fn prepare_is_pure() {
    let image = solid_image(100, 60, [10, 20, 30]);
    let a = prepare(&image, 16, 16);
    let b = prepare(&image, 16, 16);
    assert_eq!(a.as_slice(), b.as_slice());
  }
}
