// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/decode.rs - 检测解码
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
use crate::labels::ClassList;

use super::Detection;
use super::tensor::OutputView;

/// 把原始输出张量解码为检测结果
///
/// 逐候选框处理：物体置信度低于阈值的直接跳过；对剩余候选框在
/// 类别分数上取 argmax（并列时保留先出现的索引），最高类别分数
/// 超过阈值才接受。两次过滤使用同一个阈值，这是刻意保留的行为。
/// 框坐标按**原始帧**的宽高反归一化，中心+尺寸转为左上角+尺寸。
/// 不做非极大值抑制，输出保持候选框索引顺序。
pub fn decode(
  output: &[f32],
  num_detections: usize,
  num_classes: usize,
  classes: &ClassList,
  frame_width: f32,
  frame_height: f32,
  confidence_threshold: f32,
) -> Result<Vec<Detection>, PipelineError> {
  if classes.len() != num_classes {
    return Err(PipelineError::LabelMismatch {
      model: num_classes,
      labels: classes.len(),
    });
  }

  let view = OutputView::new(output, num_detections, num_classes)?;
  let mut detections = Vec::new();

  for i in 0..view.num_detections() {
    let objectness = view.objectness(i);
    if objectness < confidence_threshold {
      continue;
    }

    // 找到最高类别分数（并列时保留先出现的索引）
    let mut max_class_score = 0.0f32;
    let mut class_id = 0usize;
    for (j, &score) in view.class_scores(i).iter().enumerate() {
      if score > max_class_score {
        max_class_score = score;
        class_id = j;
      }
    }

    // 第二次置信度过滤，与物体置信度共用同一阈值
    if max_class_score > confidence_threshold {
      let cx = view.cx(i) * frame_width;
      let cy = view.cy(i) * frame_height;
      let w = view.w(i) * frame_width;
      let h = view.h(i) * frame_height;

      detections.push(Detection {
        x: cx - w / 2.0,
        y: cy - h / 2.0,
        width: w,
        height: h,
        confidence: max_class_score,
        class_id,
        class_name: classes.name(class_id).to_string(),
      });
    }
  }

  Ok(detections)
}
