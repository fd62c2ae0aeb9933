// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/mod.rs - 目标检测器
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

mod decode;
mod preprocess;
mod tensor;

pub use decode::decode;
pub use preprocess::{INPUT_HEIGHT, INPUT_WIDTH, InputTensor, prepare};
pub use tensor::{BOX_FIELDS, OutputView};

use image::RgbImage;
use tracing::debug;

use crate::error::PipelineError;
use crate::labels::ClassList;
use crate::model::Model;

/// 检测结果
///
/// 坐标为原始帧分辨率下的像素值，(x, y) 为边界框左上角。
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
}

/// 目标检测器
///
/// 组合 预处理 → 推理 → 解码，各阶段之间只传递显式参数，
/// 帧与帧之间不保留任何状态。
pub struct Detector<M> {
  model: M,
  classes: ClassList,
  confidence_threshold: f32,
}

impl<M: Model> Detector<M> {
  /// 创建检测器
  ///
  /// 模型输出的类别数量与标签文件不一致属于配置错误，
  /// 在这里直接拒绝，避免带病运行。
  pub fn new(model: M, classes: ClassList, confidence_threshold: f32) -> Result<Self, PipelineError> {
    if classes.len() != model.num_classes() {
      return Err(PipelineError::LabelMismatch {
        model: model.num_classes(),
        labels: classes.len(),
      });
    }

    Ok(Self {
      model,
      classes,
      confidence_threshold,
    })
  }

  /// 对一帧图像运行检测
  pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
    let input = prepare(image, self.model.input_width(), self.model.input_height());
    debug!("输入张量: {} 个浮点值", input.len());

    let output = self.model.run(&input)?;

    decode(
      &output,
      self.model.num_detections(),
      self.model.num_classes(),
      &self.classes,
      image.width() as f32,
      image.height() as f32,
      self.confidence_threshold,
    )
  }

  pub fn classes(&self) -> &ClassList {
    &self.classes
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }
}
