// 该文件是 Guanlan （观澜） 项目的一部分。
// src/pipeline.rs - 流水线编排
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

use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::detector::Detector;
use crate::input::InputSource;
use crate::model::Model;
use crate::output::{DisplaySink, QUIT_KEY, Visualizer};

const KEY_POLL_TIMEOUT_MS: u64 = 1;

/// 流水线状态
///
/// 进入 Stopped 后不再处理帧，属于终态；启动失败和运行期错误
/// 通过 `run` 的 Err 分支表达，同样是终态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
  Running,
  Stopped,
}

/// 运行结束后的统计
#[derive(Debug)]
pub struct PipelineReport {
  /// 处理的帧数
  pub frames: u64,
  /// 检测总数
  pub detections: usize,
  /// 结束时的状态
  pub state: PipelineState,
}

/// 流水线编排器
///
/// 驱动 获取 → 预处理 → 推理 → 解码 → 标注/展示 的逐帧循环。
/// 严格串行：一帧完整处理结束后才获取下一帧，迭代之间不共享
/// 可变状态。停止是协作式的，每次迭代轮询一次按键和停止信号，
/// 迭代中途的停止请求要等当前帧处理完才生效。
pub struct Pipeline<M> {
  source: Box<dyn InputSource>,
  detector: Detector<M>,
  sink: Box<dyn DisplaySink>,
  visualizer: Visualizer,
  max_frames: u64,
  stop_signal: Option<Receiver<()>>,
}

impl<M: Model> Pipeline<M> {
  /// 创建流水线
  ///
  /// 输入源、检测器和显示面都已经成功打开，流水线从 Running
  /// 状态开始。
  pub fn new(
    source: Box<dyn InputSource>,
    detector: Detector<M>,
    sink: Box<dyn DisplaySink>,
  ) -> Self {
    let visualizer = Visualizer::new(detector.classes().len());

    Self {
      source,
      detector,
      sink,
      visualizer,
      max_frames: 0,
      stop_signal: None,
    }
  }

  /// 设置最大处理帧数，0 表示无限制
  pub fn with_max_frames(mut self, max_frames: u64) -> Self {
    self.max_frames = max_frames;
    self
  }

  /// 设置外部停止信号（例如 Ctrl-C），每次迭代轮询一次
  pub fn with_stop_signal(mut self, stop_signal: Receiver<()>) -> Self {
    self.stop_signal = Some(stop_signal);
    self
  }

  /// 运行流水线直到停止
  ///
  /// 运行期错误不做重试，关闭显示面后向上传播；
  /// 输入源在 Pipeline 被丢弃时释放设备。
  pub fn run(mut self) -> Result<PipelineReport> {
    let result = self.run_loop();
    let closed = self.sink.close();

    match result {
      Ok(report) => {
        closed.context("无法关闭显示面")?;
        Ok(report)
      }
      // 保留原始错误，关闭失败只记录
      Err(e) => {
        if let Err(close_err) = closed {
          warn!("关闭显示面失败: {}", close_err);
        }
        Err(e)
      }
    }
  }

  fn run_loop(&mut self) -> Result<PipelineReport> {
    let mut state = PipelineState::Running;
    let mut frames = 0u64;
    let mut total_detections = 0usize;

    while state == PipelineState::Running {
      let frame = match self.source.next() {
        None => {
          info!("输入源结束, 停止流水线");
          state = PipelineState::Stopped;
          continue;
        }
        Some(Err(e)) => return Err(e).context("无法获取帧"),
        Some(Ok(frame)) => frame,
      };

      let now = Instant::now();
      let detections = self.detector.detect(&frame.image).context("检测失败")?;
      debug!(
        "第 {} 帧: 检测到 {} 个目标, 耗时 {:.2?}",
        frame.index,
        detections.len(),
        now.elapsed()
      );
      total_detections += detections.len();

      // 标注绘制在当前帧自己的图像上
      let mut annotated = frame.image;
      self.visualizer.draw_detections(&mut annotated, &detections);
      self.sink.show(&annotated).context("无法展示帧")?;

      frames += 1;

      if self.sink.poll_key(KEY_POLL_TIMEOUT_MS)? == Some(QUIT_KEY) {
        info!("收到退出按键, 停止流水线");
        state = PipelineState::Stopped;
      }

      if let Some(stop) = &self.stop_signal {
        if stop.try_recv().is_ok() {
          warn!("收到停止信号, 停止流水线");
          state = PipelineState::Stopped;
        }
      }

      if self.max_frames > 0 && frames >= self.max_frames {
        info!("已达到最大帧数 {}, 停止流水线", self.max_frames);
        state = PipelineState::Stopped;
      }
    }

    info!("流水线停止: 共处理 {} 帧, {} 个检测", frames, total_detections);
    Ok(PipelineReport {
      frames,
      detections: total_detections,
      state,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use image::{Rgb, RgbImage};

  use super::*;
  use crate::detector::InputTensor;
  use crate::error::PipelineError;
  use crate::input::{Frame, InputSourceType};
  use crate::labels::ClassList;

  /// 返回预置张量的假模型
  struct FakeModel {
    num_detections: usize,
    num_classes: usize,
    tensor: Vec<f32>,
    fail: bool,
  }

  impl FakeModel {
    fn empty(num_classes: usize) -> Self {
      // 1 个候选框, 全零分数: 永远不产生检测
      Self {
        num_detections: 1,
        num_classes,
        tensor: vec![0.0; 5 + num_classes],
        fail: false,
      }
    }

    fn with_tensor(num_detections: usize, num_classes: usize, tensor: Vec<f32>) -> Self {
      Self {
        num_detections,
        num_classes,
        tensor,
        fail: false,
      }
    }

    fn failing(num_classes: usize) -> Self {
      let mut model = Self::empty(num_classes);
      model.fail = true;
      model
    }
  }

  impl Model for FakeModel {
    fn input_width(&self) -> u32 {
      8
    }

    fn input_height(&self) -> u32 {
      8
    }

    fn num_detections(&self) -> usize {
      self.num_detections
    }

    fn num_classes(&self) -> usize {
      self.num_classes
    }

    fn run(&self, _input: &InputTensor) -> Result<Vec<f32>, PipelineError> {
      if self.fail {
        return Err(PipelineError::Inference("引擎故障".to_string()));
      }
      Ok(self.tensor.clone())
    }
  }

  /// 产出固定帧序列的假输入源
  struct FakeSource {
    frames: Vec<RgbImage>,
    next: usize,
  }

  impl FakeSource {
    fn new(count: usize) -> Self {
      // 每帧用不同灰度值填充, 便于检查展示顺序
      let frames = (0..count)
        .map(|i| RgbImage::from_pixel(64, 64, Rgb([(i * 10) as u8; 3])))
        .collect();
      Self { frames, next: 0 }
    }
  }

  impl Iterator for FakeSource {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
      if self.next >= self.frames.len() {
        return None;
      }
      let index = self.next as u64;
      let image = self.frames[self.next].clone();
      self.next += 1;
      Some(Ok(Frame {
        image,
        index,
        timestamp_ms: index * 33,
      }))
    }
  }

  impl InputSource for FakeSource {
    fn source_type(&self) -> InputSourceType {
      InputSourceType::Image
    }

    fn width(&self) -> u32 {
      64
    }

    fn height(&self) -> u32 {
      64
    }

    fn fps(&self) -> Option<f64> {
      None
    }
  }

  #[derive(Default)]
  struct SinkLog {
    shown: Vec<RgbImage>,
    closed: bool,
  }

  /// 记录展示帧并可按脚本发出退出按键的假显示面
  struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
    quit_after: Option<u64>,
  }

  impl RecordingSink {
    fn new() -> (Self, Arc<Mutex<SinkLog>>) {
      let log = Arc::new(Mutex::new(SinkLog::default()));
      (
        Self {
          log: Arc::clone(&log),
          quit_after: None,
        },
        log,
      )
    }

    fn quit_after(mut self, frames: u64) -> Self {
      self.quit_after = Some(frames);
      self
    }
  }

  impl DisplaySink for RecordingSink {
    fn show(&mut self, image: &RgbImage) -> anyhow::Result<()> {
      self.log.lock().unwrap().shown.push(image.clone());
      Ok(())
    }

    fn poll_key(&mut self, _timeout_ms: u64) -> anyhow::Result<Option<char>> {
      let shown = self.log.lock().unwrap().shown.len() as u64;
      match self.quit_after {
        Some(limit) if shown >= limit => Ok(Some(QUIT_KEY)),
        _ => Ok(None),
      }
    }

    fn close(&mut self) -> anyhow::Result<()> {
      self.log.lock().unwrap().closed = true;
      Ok(())
    }
  }

  fn classes(n: usize) -> ClassList {
    ClassList::from_names((0..n).map(|i| format!("class{}", i)).collect())
  }

  fn pipeline(
    source: FakeSource,
    model: FakeModel,
    sink: RecordingSink,
  ) -> Pipeline<FakeModel> {
    let num_classes = model.num_classes();
    let detector = Detector::new(model, classes(num_classes), 0.4).unwrap();
    Pipeline::new(Box::new(source), detector, Box::new(sink))
  }

  #[test]
  fn end_of_stream_stops_pipeline() {
    let (sink, log) = RecordingSink::new();
    let report = pipeline(FakeSource::new(3), FakeModel::empty(3), sink)
      .run()
      .unwrap();

    assert_eq!(report.frames, 3);
    assert_eq!(report.detections, 0);
    assert_eq!(report.state, PipelineState::Stopped);

    let log = log.lock().unwrap();
    assert_eq!(log.shown.len(), 3);
    assert!(log.closed);
  }

  #[test]
  fn quit_key_stops_after_current_frame() {
    let (sink, log) = RecordingSink::new();
    let report = pipeline(FakeSource::new(5), FakeModel::empty(3), sink.quit_after(1))
      .run()
      .unwrap();

    assert_eq!(report.frames, 1);
    assert_eq!(report.state, PipelineState::Stopped);
    assert!(log.lock().unwrap().closed);
  }

  #[test]
  fn stop_signal_is_polled_each_iteration() {
    let (sink, _log) = RecordingSink::new();
    let (tx, rx) = std::sync::mpsc::channel();
    tx.send(()).unwrap();

    let report = pipeline(FakeSource::new(5), FakeModel::empty(3), sink)
      .with_stop_signal(rx)
      .run()
      .unwrap();

    // 停止请求在第一帧处理完之后生效
    assert_eq!(report.frames, 1);
    assert_eq!(report.state, PipelineState::Stopped);
  }

  #[test]
  fn max_frames_bounds_the_loop() {
    let (sink, _log) = RecordingSink::new();
    let report = pipeline(FakeSource::new(10), FakeModel::empty(3), sink)
      .with_max_frames(4)
      .run()
      .unwrap();

    assert_eq!(report.frames, 4);
  }

  #[test]
  fn inference_error_terminates_and_closes_sink() {
    let (sink, log) = RecordingSink::new();
    let result = pipeline(FakeSource::new(3), FakeModel::failing(3), sink).run();

    assert!(result.is_err());
    let log = log.lock().unwrap();
    assert!(log.shown.is_empty());
    assert!(log.closed);
  }

  #[test]
  fn frames_are_shown_in_acquisition_order() {
    let (sink, log) = RecordingSink::new();
    pipeline(FakeSource::new(4), FakeModel::empty(3), sink)
      .run()
      .unwrap();

    let log = log.lock().unwrap();
    // 全零张量不产生检测, 帧原样展示, 右下角像素不受标注影响
    for (i, image) in log.shown.iter().enumerate() {
      assert_eq!(*image.get_pixel(63, 63), Rgb([(i * 10) as u8; 3]));
    }
  }

  #[test]
  fn passing_detection_is_drawn_on_its_frame() {
    // 两个候选框: 一个双阈值都通过, 一个物体置信度不足
    let mut tensor = vec![0.5, 0.5, 0.5, 0.5, 0.9, 0.2, 0.81, 0.3];
    tensor.extend_from_slice(&[0.5, 0.5, 0.5, 0.5, 0.1, 0.9, 0.9, 0.9]);

    let (sink, log) = RecordingSink::new();
    let report = pipeline(
      FakeSource::new(1),
      FakeModel::with_tensor(2, 3, tensor),
      sink,
    )
    .run()
    .unwrap();

    assert_eq!(report.frames, 1);
    assert_eq!(report.detections, 1);

    let log = log.lock().unwrap();
    // 边界框在 64x64 帧上的左上角 (16, 16) 被染色
    assert_ne!(*log.shown[0].get_pixel(16, 16), Rgb([0; 3]));
  }

  #[test]
  fn label_mismatch_is_rejected_at_construction() {
    let model = FakeModel::empty(3);
    let result = Detector::new(model, classes(2), 0.4);
    assert!(matches!(
      result,
      Err(PipelineError::LabelMismatch { model: 3, labels: 2 })
    ));
  }
}
