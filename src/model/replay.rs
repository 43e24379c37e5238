// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/replay.rs - 回放检测器导出的原始预测
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

use std::{
  fs::File,
  io::BufReader,
  marker::PhantomData,
  path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, model::Detector};

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("模型路径必须使用 {expected} 方案, 实际为 {found}")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("无法读取预测文件 {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("预测文件 {path} 解析失败: {source}")]
  Json {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/// 从 JSON 文件回放检测器的原始预测
///
/// 路径为文件时每一帧都使用该文件；路径为目录时读取 `<目录>/<帧名称>.json`。
/// `R` 决定解析出的原始输出类型，也就决定了后处理分支。
pub struct ReplayDetector<R> {
  path: PathBuf,
  _phantom: PhantomData<fn() -> R>,
}

impl<R> ReplayDetector<R> {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      _phantom: PhantomData,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn dump_path(&self, frame: &Frame) -> PathBuf {
    if self.path.is_dir() {
      self.path.join(format!("{}.json", frame.name()))
    } else {
      self.path.clone()
    }
  }
}

impl<R> FromUrlWithScheme for ReplayDetector<R> {
  const SCHEME: &'static str = "replay";
}

impl<R> FromUrl for ReplayDetector<R> {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    info!("回放预测来源: {}", url.path());
    Ok(Self::new(url.path()))
  }
}

impl<R: DeserializeOwned> Detector for ReplayDetector<R> {
  type Raw = R;
  type Error = ReplayError;

  fn detect(&self, frame: &Frame) -> Result<Self::Raw, Self::Error> {
    let path = self.dump_path(frame);
    debug!("读取第 {} 帧的预测文件: {}", frame.index(), path.display());

    let file = File::open(&path).map_err(|source| ReplayError::Io {
      path: path.clone(),
      source,
    })?;
    serde_json::from_reader(BufReader::new(file))
      .map_err(|source| ReplayError::Json { path, source })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{RawDetections, RawSegmentations};
  use image::RgbImage;

  fn frame(name: &str) -> Frame {
    Frame::new(RgbImage::new(4, 4), 0, name)
  }

  #[test]
  fn replays_a_single_file_for_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    std::fs::write(&path, "[[[1, 1, 2, 2, 0.9]], [[0, 0, 4, 4, 0.3]]]").unwrap();

    let detector = ReplayDetector::<RawDetections>::new(&path);
    let raw = detector.detect(&frame("a")).unwrap();
    assert_eq!(raw.num_records(), 2);
    assert_eq!(detector.detect(&frame("b")).unwrap(), raw);
  }

  #[test]
  fn replays_per_frame_files_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("cam-01.json"),
      r#"{"bboxes": [[[0, 0, 1, 1, 0.9]]], "masks": [[[[1, 0], [0, 0]]]]}"#,
    )
    .unwrap();

    let detector = ReplayDetector::<RawSegmentations>::new(dir.path());
    let raw = detector.detect(&frame("cam-01")).unwrap();
    assert_eq!(raw.detections().num_records(), 1);

    let err = detector.detect(&frame("cam-02")).unwrap_err();
    assert!(matches!(err, ReplayError::Io { .. }));
  }

  #[test]
  fn malformed_dump_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    std::fs::write(&path, "[[[1, 1, 2, 0.9]]]").unwrap();

    let err = ReplayDetector::<RawDetections>::new(&path)
      .detect(&frame("a"))
      .unwrap_err();
    assert!(matches!(err, ReplayError::Json { .. }));
  }

  #[test]
  fn url_scheme_is_checked() {
    let url = Url::parse("replay:///tmp/dumps").unwrap();
    let detector = ReplayDetector::<RawDetections>::from_url(&url).unwrap();
    assert_eq!(detector.path(), Path::new("/tmp/dumps"));

    let url = Url::parse("yolo26:///tmp/model.rknn").unwrap();
    assert!(ReplayDetector::<RawDetections>::from_url(&url).is_err());
  }
}
