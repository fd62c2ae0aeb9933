// 该文件是 Guanlan （观澜） 项目的一部分。
// src/error.rs - 流水线错误定义
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

use thiserror::Error;

/// 流水线错误
#[derive(Error, Debug)]
pub enum PipelineError {
  /// 视频设备无法打开（启动期致命）
  #[error("无法打开视频设备: {0}")]
  DeviceUnavailable(String),
  /// 模型文件无法加载（启动期致命）
  #[error("无法加载模型 {path}: {reason}")]
  ModelLoad { path: String, reason: String },
  /// 推理过程失败（终止循环）
  #[error("推理失败: {0}")]
  Inference(String),
  /// 模型输出的类别分数数量与标签文件不一致
  #[error("类别数量不匹配: 模型输出 {model} 个类别分数, 标签文件包含 {labels} 个类别")]
  LabelMismatch { model: usize, labels: usize },
}
