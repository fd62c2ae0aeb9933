// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/mod.rs - 输入源模块
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

mod image_source;
mod v4l2_source;

use anyhow::{Result, bail};
use image::RgbImage;

pub use image_source::ImageSource;
pub use v4l2_source::V4l2Source;

/// 帧数据
///
/// 每次循环迭代产生一帧，归当前迭代独占，迭代结束即丢弃。
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// V4L2 摄像头
  V4l2,
}

/// 输入源 trait
///
/// 迭代产生帧；迭代结束（返回 None）视为流结束，不是错误。
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建输入源
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  // V4L2 设备
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    let device_path = source.trim_start_matches("v4l2://");
    return Ok(Box::new(V4l2Source::new(device_path)?));
  }

  // 图片文件
  let lower = source.to_lowercase();
  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
    || lower.ends_with(".webp")
  {
    return Ok(Box::new(ImageSource::new(source)?));
  }

  bail!("无法识别的输入源: {}", source)
}
