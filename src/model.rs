// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model.rs - 推理模型抽象
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

use crate::detector::InputTensor;
use crate::error::PipelineError;

/// 推理模型
///
/// 推理引擎对流水线不透明：给定固定形状的输入张量，返回固定形状的
/// 输出张量。输入输出形状在加载时查询一次，之后每帧复用。
/// 解码与编排逻辑只依赖这个接口，测试时可以用假引擎返回预置张量。
pub trait Model {
  /// 模型输入宽度
  fn input_width(&self) -> u32;

  /// 模型输入高度
  fn input_height(&self) -> u32;

  /// 输出张量中候选框数量 N
  fn num_detections(&self) -> usize;

  /// 每个候选框携带的类别分数数量 C
  fn num_classes(&self) -> usize;

  /// 执行一次推理，返回扁平的输出张量，逻辑形状 (1, N, 5 + C)
  fn run(&self, input: &InputTensor) -> Result<Vec<f32>, PipelineError>;
}

mod tract;
pub use self::tract::TractModel;
