// 该文件是 Guanlan （观澜） 项目的一部分。
// src/labels.rs - 类别标签列表
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

use anyhow::{Context, Result};

/// 类别标签列表
///
/// 从文本文件加载，每行一个类别名，行号即类别索引。
/// 启动时加载一次，之后只读。
#[derive(Clone, Debug)]
pub struct ClassList {
  names: Vec<String>,
}

impl ClassList {
  /// 从标签文件加载类别列表
  pub fn from_file(path: &str) -> Result<Self> {
    let content =
      std::fs::read_to_string(path).with_context(|| format!("无法读取标签文件: {}", path))?;
    Ok(Self::parse(&content))
  }

  /// 从文本内容解析类别列表，空行跳过
  pub fn parse(content: &str) -> Self {
    let names = content
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    Self { names }
  }

  pub fn from_names(names: Vec<String>) -> Self {
    Self { names }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 按类别索引获取类别名，越界返回 "unknown"
  pub fn name(&self, class_id: usize) -> &str {
    self.names.get(class_id).map(String::as_str).unwrap_or("unknown")
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }
}
