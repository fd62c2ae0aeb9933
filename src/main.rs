// 该文件是 Guanlan （观澜） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use guanlan::detector::{Detector, INPUT_HEIGHT, INPUT_WIDTH};
use guanlan::input::{InputSourceType, create_input_source};
use guanlan::labels::ClassList;
use guanlan::model::TractModel;
use guanlan::output::create_display_sink;
use guanlan::pipeline::Pipeline;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("标签文件路径: {}", args.labels);
  info!("输入来源: {}", args.input);
  info!("输出目录: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  // 启动期任一失败直接退出, 不留下半启动状态
  let classes = ClassList::from_file(&args.labels)?;
  info!("已加载 {} 个类别", classes.len());

  let model = TractModel::new(Path::new(&args.model), INPUT_WIDTH, INPUT_HEIGHT)?;
  let detector = Detector::new(model, classes, args.confidence)?;

  let source = create_input_source(&args.input)?;
  info!(
    "输入源已打开: {}x{} {}",
    source.width(),
    source.height(),
    match source.source_type() {
      InputSourceType::Image => "图片",
      InputSourceType::V4l2 => "V4L2 摄像头",
    }
  );

  let sink = create_display_sink(&args.output)?;

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    let _ = tx.send(());
  })
  .context("无法设置 Ctrl-C 处理器")?;

  let report = Pipeline::new(source, detector, sink)
    .with_max_frames(args.max_frames)
    .with_stop_signal(rx)
    .run()?;

  info!("处理完成: 共 {} 帧, {} 个检测", report.frames, report.detections);
  Ok(())
}
