// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/image_source.rs - 图片输入源
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

use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};

use super::{Frame, InputSource, InputSourceType};

/// 图片输入源
///
/// 产出一帧后即流结束，用于在没有摄像头的环境下跑完整条流水线。
pub struct ImageSource {
  image: Option<RgbImage>,
  width: u32,
  height: u32,
}

impl ImageSource {
  /// 创建一个新的图片输入源
  pub fn new(path: &str) -> Result<Self> {
    let image = ImageReader::open(path)
      .with_context(|| format!("无法打开图片文件: {}", path))?
      .decode()
      .with_context(|| format!("无法解码图片文件: {}", path))?
      .to_rgb8();

    let width = image.width();
    let height = image.height();

    Ok(Self {
      image: Some(image),
      width,
      height,
    })
  }
}

impl Iterator for ImageSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(|image| {
      Ok(Frame {
        image,
        index: 0,
        timestamp_ms: 0,
      })
    })
  }
}

impl InputSource for ImageSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Image
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    None
  }
}
