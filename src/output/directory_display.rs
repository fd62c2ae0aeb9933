// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/directory_display.rs - 目录显示面
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::info;

use super::DisplaySink;

/// 目录显示面
///
/// 无头环境下的显示实现：把标注好的帧按序号保存为 PNG 序列。
/// 没有键盘输入，`poll_key` 恒为 None，退出依赖流结束、帧数上限
/// 或 Ctrl-C。
pub struct DirectoryDisplay {
  dir: PathBuf,
  frame_index: u64,
}

impl DirectoryDisplay {
  /// 创建目录显示面，目录不存在时自动创建
  pub fn new(dir: &str) -> Result<Self> {
    std::fs::create_dir_all(dir).with_context(|| format!("无法创建输出目录: {}", dir))?;

    Ok(Self {
      dir: PathBuf::from(dir),
      frame_index: 0,
    })
  }
}

impl DisplaySink for DirectoryDisplay {
  fn show(&mut self, image: &RgbImage) -> Result<()> {
    let path = self.dir.join(format!("frame_{:06}.png", self.frame_index));
    image
      .save(&path)
      .with_context(|| format!("无法保存图片: {}", path.display()))?;

    self.frame_index += 1;
    Ok(())
  }

  fn poll_key(&mut self, _timeout_ms: u64) -> Result<Option<char>> {
    Ok(None)
  }

  fn close(&mut self) -> Result<()> {
    info!("显示面关闭: 共写出 {} 帧到 {}", self.frame_index, self.dir.display());
    Ok(())
  }
}
