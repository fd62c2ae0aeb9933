// 该文件是 Guanlan （观澜） 项目的一部分。
// src/model/tract.rs - tract-onnx 推理后端
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

use std::path::Path;

use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::detector::{BOX_FIELDS, InputTensor};
use crate::error::PipelineError;
use crate::model::Model;

const RGB_CHANNELS: usize = 3;

/// 基于 tract-onnx 的推理模型
///
/// 加载本地 ONNX 模型文件并在 CPU 上执行，不做任何网络 I/O。
pub struct TractModel {
  plan: TypedSimplePlan<TypedModel>,
  input_width: u32,
  input_height: u32,
  num_detections: usize,
  num_classes: usize,
}

impl TractModel {
  /// 从磁盘加载 ONNX 模型并准备推理计划
  ///
  /// 输入固定为 (1, 3, height, width) 的 f32 张量；输出形状在这里
  /// 查询一次，必须是 (1, N, 5 + C)。
  pub fn new(path: &Path, input_width: u32, input_height: u32) -> Result<Self, PipelineError> {
    let load_err = |reason: String| PipelineError::ModelLoad {
      path: path.display().to_string(),
      reason,
    };

    info!("加载模型文件: {}", path.display());
    let plan = tract_onnx::onnx()
      .model_for_path(path)
      .map_err(|e| load_err(e.to_string()))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(
          f32::datum_type(),
          tvec!(1, RGB_CHANNELS, input_height as usize, input_width as usize),
        ),
      )
      .map_err(|e| load_err(e.to_string()))?
      .into_optimized()
      .map_err(|e| load_err(e.to_string()))?
      .into_runnable()
      .map_err(|e| load_err(e.to_string()))?;

    // 输出形状只在加载时查询一次，之后每帧复用
    let fact = plan
      .model()
      .output_fact(0)
      .map_err(|e| load_err(e.to_string()))?;
    let shape = fact
      .shape
      .as_concrete()
      .ok_or_else(|| load_err("输出张量形状不是常量".to_string()))?;

    if shape.len() != 3 || shape[0] != 1 || shape[2] <= BOX_FIELDS {
      return Err(load_err(format!("输出张量形状 {:?} 不是 (1, N, 5 + C)", shape)));
    }

    let num_detections = shape[1];
    let num_classes = shape[2] - BOX_FIELDS;
    info!(
      "模型加载完成: 输入 {}x{}, 输出 {} x (5 + {})",
      input_width, input_height, num_detections, num_classes
    );

    Ok(Self {
      plan,
      input_width,
      input_height,
      num_detections,
      num_classes,
    })
  }
}

impl Model for TractModel {
  fn input_width(&self) -> u32 {
    self.input_width
  }

  fn input_height(&self) -> u32 {
    self.input_height
  }

  fn num_detections(&self) -> usize {
    self.num_detections
  }

  fn num_classes(&self) -> usize {
    self.num_classes
  }

  fn run(&self, input: &InputTensor) -> Result<Vec<f32>, PipelineError> {
    if input.width() != self.input_width || input.height() != self.input_height {
      return Err(PipelineError::Inference(format!(
        "输入张量尺寸 {}x{} 与模型输入 {}x{} 不符",
        input.width(),
        input.height(),
        self.input_width,
        self.input_height
      )));
    }

    let height = self.input_height as usize;
    let width = self.input_width as usize;
    let tensor =
      tract_ndarray::Array4::from_shape_vec((1, RGB_CHANNELS, height, width), input.as_slice().to_vec())
        .map_err(|e| PipelineError::Inference(e.to_string()))?
        .into_tensor();

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| PipelineError::Inference(e.to_string()))?;

    let output = outputs
      .first()
      .ok_or_else(|| PipelineError::Inference("模型没有产生输出".to_string()))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(|e| PipelineError::Inference(e.to_string()))?;

    Ok(view.iter().copied().collect())
  }
}
