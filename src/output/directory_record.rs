// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  io::BufWriter,
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::AsDetectResult,
  output::{
    Render,
    draw::{Draw, DrawDetectionOnFrame},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 保存标注后的图像，或保存原图并附带 JSON 格式的流水线输出
pub enum DrawWrapper {
  Draw(Box<Draw>),
  Record,
}

impl DrawWrapper {
  pub fn save_result<R>(
    &self,
    path: &Path,
    frame: &Frame,
    result: &R,
  ) -> Result<(), DirectoryRecordOutputError>
  where
    R: AsDetectResult + Serialize,
  {
    match self {
      DrawWrapper::Draw(draw) => {
        draw.draw_detection(frame, result).save(path)?;
      }
      DrawWrapper::Record => {
        frame.image().save(path)?;
        let writer = BufWriter::new(File::create(path.with_extension("json"))?);
        serde_json::to_writer_pretty(writer, result)?;
      }
    };

    Ok(())
  }
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let show_labels = uri.query_pairs().any(|(k, _)| k == "labels");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    let draw = if record {
      DrawWrapper::Record
    } else {
      DrawWrapper::Draw(Box::new(Draw::default().show_labels(show_labels)))
    };

    Ok(DirectoryRecordOutput::new(uri.path(), draw, always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, draw: DrawWrapper, always: bool) -> Self {
    Self {
      directory: directory.into(),
      draw,
      frame_counter: AtomicU16::new(0),
      always,
    }
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl<R> Render<Frame, R> for DirectoryRecordOutput
where
  R: AsDetectResult + Serialize,
{
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &R) -> Result<(), Self::Error> {
    if !self.always && result.detect_result().is_empty() {
      debug!("第 {} 帧无检测结果，不记录", frame.index());
      return Ok(());
    }

    let path = self.frame_path(Utc::now())?;
    self.draw.save_result(&path, frame, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ImageSize, Normalizer, RawDetections, ScoreThreshold};
  use image::RgbImage;

  fn files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == ext) {
          found.push(path);
        }
      }
    }
    found
  }

  fn one_detection() -> crate::model::DetectResult {
    let raw = RawDetections::new(vec![vec![[1.0, 1.0, 3.0, 3.0, 0.9]]]);
    Normalizer::new(ScoreThreshold::new(0.5).unwrap())
      .normalize_detections(&raw, ImageSize::new(4, 4).unwrap())
  }

  #[test]
  fn record_mode_writes_image_and_pipeline_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path(), DrawWrapper::Record, false);
    let frame = Frame::new(RgbImage::new(4, 4), 0, "f");

    output.render_result(&frame, &one_detection()).unwrap();

    assert_eq!(files_with_extension(dir.path(), "png").len(), 1);
    let records = files_with_extension(dir.path(), "json");
    assert_eq!(records.len(), 1);
    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(value["labels"], serde_json::json!(["0"]));
    assert_eq!(
      value["boxes"],
      serde_json::json!([[0.25, 0.25, 0.75, 0.75]])
    );
  }

  #[test]
  fn empty_results_are_skipped_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let frame = Frame::new(RgbImage::new(4, 4), 0, "f");
    let empty = crate::model::DetectResult::default();

    let output = DirectoryRecordOutput::new(dir.path(), DrawWrapper::Record, false);
    output.render_result(&frame, &empty).unwrap();
    assert!(files_with_extension(dir.path(), "png").is_empty());

    let output = DirectoryRecordOutput::new(dir.path(), DrawWrapper::Record, true);
    output.render_result(&frame, &empty).unwrap();
    output.render_result(&frame, &empty).unwrap();
    assert_eq!(files_with_extension(dir.path(), "png").len(), 2);
  }

  #[test]
  fn frame_ids_increase() {
    let output = DirectoryRecordOutput::new("/tmp", DrawWrapper::Record, false);
    assert_eq!(output.frame_id(), 1);
    assert_eq!(output.frame_id(), 2);
  }
}
