// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/tensor.rs - 输出张量的类型化视图
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

use crate::error::PipelineError;

/// 每个候选框的固定字段数: cx, cy, w, h, objectness
pub const BOX_FIELDS: usize = 5;

const FIELD_CX: usize = 0;
const FIELD_CY: usize = 1;
const FIELD_W: usize = 2;
const FIELD_H: usize = 3;
const FIELD_OBJECTNESS: usize = 4;

/// 输出张量的类型化视图
///
/// 把推理引擎返回的扁平浮点缓冲区按 (候选框索引, 字段) 访问，
/// 逻辑形状为 (1, N, 5 + C)，零拷贝。
pub struct OutputView<'a> {
  data: &'a [f32],
  num_detections: usize,
  stride: usize,
}

impl<'a> OutputView<'a> {
  /// 构造视图，缓冲区长度必须与形状一致
  pub fn new(
    data: &'a [f32],
    num_detections: usize,
    num_classes: usize,
  ) -> Result<Self, PipelineError> {
    let stride = BOX_FIELDS + num_classes;
    let expected = num_detections * stride;
    if data.len() != expected {
      return Err(PipelineError::Inference(format!(
        "输出张量长度 {} 与形状 {} x {} 不符",
        data.len(),
        num_detections,
        stride
      )));
    }

    Ok(Self {
      data,
      num_detections,
      stride,
    })
  }

  pub fn num_detections(&self) -> usize {
    self.num_detections
  }

  fn field(&self, index: usize, offset: usize) -> f32 {
    debug_assert!(index < self.num_detections);
    self.data[index * self.stride + offset]
  }

  /// 归一化的框中心 x
  pub fn cx(&self, index: usize) -> f32 {
    self.field(index, FIELD_CX)
  }

  /// 归一化的框中心 y
  pub fn cy(&self, index: usize) -> f32 {
    self.field(index, FIELD_CY)
  }

  /// 归一化的框宽度
  pub fn w(&self, index: usize) -> f32 {
    self.field(index, FIELD_W)
  }

  /// 归一化的框高度
  pub fn h(&self, index: usize) -> f32 {
    self.field(index, FIELD_H)
  }

  /// 物体置信度
  pub fn objectness(&self, index: usize) -> f32 {
    self.field(index, FIELD_OBJECTNESS)
  }

  /// 该候选框的全部类别分数
  pub fn class_scores(&self, index: usize) -> &'a [f32] {
    debug_assert!(index < self.num_detections);
    let base = index * self.stride + BOX_FIELDS;
    &self.data[base..base + self.stride - BOX_FIELDS]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fields_follow_stride() {
    // 2 个候选框, 2 个类别, stride = 7
    let data = [
      0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, //
      1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7,
    ];
    let view = OutputView::new(&data, 2, 2).unwrap();

    assert_eq!(view.num_detections(), 2);
    assert_eq!(view.cx(0), 0.1);
    assert_eq!(view.objectness(0), 0.5);
    assert_eq!(view.class_scores(0), &[0.6, 0.7]);
    assert_eq!(view.cy(1), 1.2);
    assert_eq!(view.h(1), 1.4);
    assert_eq!(view.class_scores(1), &[1.6, 1.7]);
  }

  #[test]
  fn rejects_wrong_length() {
    let data = [0.0f32; 13];
    let result = OutputView::new(&data, 2, 2);
    assert!(matches!(result, Err(PipelineError::Inference(_))));
  }
}
