// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头输入源
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

use std::pin::Pin;
use std::time::Instant;

use anyhow::{Result, anyhow};
use image::RgbImage;
use tracing::info;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::error::PipelineError;

use super::{Frame, InputSource, InputSourceType};

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;
const CAPTURE_BUFFERS: u32 = 4;

/// V4L2 摄像头输入源
///
/// v4l 的 Stream 需要引用 Device，用 Pin<Box> 固定 Device 的内存
/// 地址，才能安全地持有引用它的 Stream。
pub struct V4l2Source {
  /// V4L2 设备（Pin<Box> 固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 绑定）
  stream: Option<Stream<'static>>,
  /// 帧索引
  frame_index: u64,
  /// 帧宽度
  width: u32,
  /// 帧高度
  height: u32,
  /// 打开设备的时刻，用于帧时间戳
  start_time: Instant,
}

impl V4l2Source {
  /// 打开 V4L2 摄像头
  ///
  /// 设备不存在或无法协商 YUYV 格式都算 `DeviceUnavailable`。
  pub fn new(device_path: &str) -> Result<Self> {
    let device = Box::pin(
      Device::with_path(device_path)
        .map_err(|e| PipelineError::DeviceUnavailable(format!("{}: {}", device_path, e)))?,
    );

    let mut format = device
      .format()
      .map_err(|e| PipelineError::DeviceUnavailable(format!("{}: {}", device_path, e)))?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device
      .set_format(&format)
      .map_err(|e| PipelineError::DeviceUnavailable(format!("{}: {}", device_path, e)))?;

    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(
        PipelineError::DeviceUnavailable(format!(
          "{}: 设备不支持 YUYV 像素格式 (实际 {})",
          device_path, format.fourcc
        ))
        .into(),
      );
    }

    info!(
      "摄像头已打开: {} {}x{} {}",
      device_path, format.width, format.height, format.fourcc
    );

    let mut source = Self {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      start_time: Instant::now(),
    };

    // SAFETY: device 被 Pin<Box> 固定在堆上不会移动；stream 与
    // device 存在同一个结构体里，Drop 时先 take 掉 stream 再释放
    // device，引用在整个存活期内有效。
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, CAPTURE_BUFFERS)
        .map_err(|e| PipelineError::DeviceUnavailable(format!("{}: {}", device_path, e)))?
    };

    source.stream = Some(stream);
    Ok(source)
  }

  /// YUYV 转 RGB
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for chunk in yuyv.chunks_exact(4) {
      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      for y in [y0, y1] {
        let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
        let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
        rgb.extend_from_slice(&[r, g, b]);
      }
    }

    rgb
  }
}

impl Drop for V4l2Source {
  fn drop(&mut self) {
    // stream 必须在 device 之前释放
    self.stream.take();
  }
}

impl Iterator for V4l2Source {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let stream = self.stream.as_mut()?;

    match stream.next() {
      Ok((buffer, _meta)) => {
        let rgb_data = Self::yuyv_to_rgb(buffer, self.width, self.height);

        let image = match RgbImage::from_raw(self.width, self.height, rgb_data) {
          Some(image) => image,
          None => return Some(Err(anyhow!("捕获缓冲区大小与帧尺寸不符"))),
        };

        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms: self.start_time.elapsed().as_millis() as u64,
        };

        self.frame_index += 1;
        Some(Ok(frame))
      }
      Err(e) => Some(Err(anyhow!("无法捕获帧: {}", e))),
    }
  }
}

impl InputSource for V4l2Source {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::V4l2
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    Some(30.0)
  }
}
