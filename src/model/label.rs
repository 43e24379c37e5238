// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/label.rs - 类别名称映射
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// 类别序号到标签文本的映射
pub trait ClassLabel {
  fn label(&self, class_index: usize) -> String;
}

/// 默认映射：直接使用类别序号的字符串形式
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexLabel;

impl ClassLabel for IndexLabel {
  fn label(&self, class_index: usize) -> String {
    class_index.to_string()
  }
}

impl<F: Fn(usize) -> String> ClassLabel for F {
  fn label(&self, class_index: usize) -> String {
    self(class_index)
  }
}

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取类别文件 {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("类别文件 {path} 格式错误: {source}")]
  Json {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/// 按名称表映射类别，表中缺失的序号回退为序号字符串
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NamedLabels {
  names: Vec<String>,
}

impl NamedLabels {
  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  /// 读取类别文件：`.json` 为字符串数组，其余格式按行读取（忽略空行）
  pub fn from_path(path: &Path) -> Result<Self, LabelError> {
    let content = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let labels = if path.extension().is_some_and(|ext| ext == "json") {
      serde_json::from_str(&content).map_err(|source| LabelError::Json {
        path: path.to_path_buf(),
        source,
      })?
    } else {
      Self::new(
        content
          .lines()
          .map(str::trim)
          .filter(|line| !line.is_empty())
          .map(String::from)
          .collect(),
      )
    };

    info!("加载 {} 个类别名称: {}", labels.names.len(), path.display());
    Ok(labels)
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }
}

impl ClassLabel for NamedLabels {
  fn label(&self, class_index: usize) -> String {
    self
      .names
      .get(class_index)
      .cloned()
      .unwrap_or_else(|| class_index.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn index_label_stringifies() {
    assert_eq!(IndexLabel.label(0), "0");
    assert_eq!(IndexLabel.label(12), "12");
  }

  #[test]
  fn named_labels_fall_back_to_index() {
    let labels = NamedLabels::new(vec!["all ppe".into(), "no helmet".into()]);
    assert_eq!(labels.label(1), "no helmet");
    assert_eq!(labels.label(5), "5");
    assert_eq!(NamedLabels::default().label(3), "3");
  }

  #[test]
  fn closures_are_label_maps() {
    let upper = |i: usize| format!("class-{i}");
    assert_eq!(upper.label(4), "class-4");
  }

  #[test]
  fn loads_json_and_text_files() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("labels.json");
    std::fs::write(&json_path, r#"["all ppe", "no vest"]"#).unwrap();
    let labels = NamedLabels::from_path(&json_path).unwrap();
    assert_eq!(
      labels.names(),
      &["all ppe".to_string(), "no vest".to_string()]
    );

    let txt_path = dir.path().join("labels.txt");
    let mut file = std::fs::File::create(&txt_path).unwrap();
    writeln!(file, "all ppe\n\nno mask ").unwrap();
    let labels = NamedLabels::from_path(&txt_path).unwrap();
    assert_eq!(
      labels.names(),
      &["all ppe".to_string(), "no mask".to_string()]
    );
  }

  #[test]
  fn bundled_label_file_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("labels/sp_ppe.json");
    let labels = NamedLabels::from_path(&path).unwrap();
    assert_eq!(labels.label(0), "all ppe");
    assert_eq!(labels.names().len(), 8);
  }

  #[test]
  fn broken_json_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = NamedLabels::from_path(&path).unwrap_err();
    assert!(matches!(err, LabelError::Json { .. }));
  }
}
