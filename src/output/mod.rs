// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/mod.rs - 显示输出模块
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

mod directory_display;
mod visualizer;

use anyhow::Result;
use image::RgbImage;

pub use directory_display::DirectoryDisplay;
pub use visualizer::Visualizer;

/// 请求停止流水线的按键
pub const QUIT_KEY: char = 'q';

/// 显示面 trait
///
/// 接收标注好的帧并展示；按键轮询是流水线的协作式退出通道。
pub trait DisplaySink {
  /// 展示一帧标注好的图像
  fn show(&mut self, image: &RgbImage) -> Result<()>;

  /// 在超时内轮询一次按键，没有按键返回 None
  fn poll_key(&mut self, timeout_ms: u64) -> Result<Option<char>>;

  /// 关闭显示面，释放相关资源
  fn close(&mut self) -> Result<()>;
}

/// 从输出路径创建显示面
pub fn create_display_sink(path: &str) -> Result<Box<dyn DisplaySink>> {
  Ok(Box::new(DirectoryDisplay::new(path)?))
}
