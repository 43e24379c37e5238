// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/ppe.rs - PPE 检测流水线节点
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

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::Frame,
  model::{ClassLabel, Detector, IndexLabel, Model, Normalizer, Postprocess, PostprocessError},
};

#[derive(Error, Debug)]
pub enum PpeModelError {
  #[error("检测器错误: {0}")]
  Detector(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("后处理错误: {0}")]
  Postprocess(#[from] PostprocessError),
}

/// 将检测器与后处理串联成一个推理节点
pub struct PpeModel<D, L = IndexLabel> {
  detector: D,
  normalizer: Normalizer<L>,
}

impl<D, L> PpeModel<D, L> {
  pub fn new(detector: D, normalizer: Normalizer<L>) -> Self {
    Self {
      detector,
      normalizer,
    }
  }

  pub fn detector(&self) -> &D {
    &self.detector
  }

  pub fn normalizer(&self) -> &Normalizer<L> {
    &self.normalizer
  }
}

impl<D, L> Model for PpeModel<D, L>
where
  D: Detector,
  D::Raw: Postprocess,
  L: ClassLabel,
{
  type Input = Frame;
  type Output = <D::Raw as Postprocess>::Output;
  type Error = PpeModelError;

  fn infer(&self, frame: &Frame) -> Result<Self::Output, Self::Error> {
    // 尺寸在调用检测器之前校验
    let size = frame.size()?;

    debug!(
      "第 {} 帧执行检测 ({}x{})",
      frame.index(),
      size.width(),
      size.height()
    );
    let raw = self
      .detector
      .detect(frame)
      .map_err(|e| PpeModelError::Detector(Box::new(e)))?;

    Ok(raw.postprocess(&self.normalizer, size)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{NamedLabels, RawDetections, RawSegmentations, ScoreThreshold};
  use image::RgbImage;
  use ndarray::Array2;
  use std::cell::Cell;

  struct FixedDetector<R> {
    raw: R,
    calls: Cell<usize>,
  }

  impl<R: Clone> Detector for FixedDetector<R> {
    type Raw = R;
    type Error = std::io::Error;

    fn detect(&self, _frame: &Frame) -> Result<R, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      Ok(self.raw.clone())
    }
  }

  struct FailingDetector;

  impl Detector for FailingDetector {
    type Raw = RawDetections;
    type Error = std::io::Error;

    fn detect(&self, _frame: &Frame) -> Result<RawDetections, Self::Error> {
      Err(std::io::Error::other("设备不可用"))
    }
  }

  fn normalizer() -> Normalizer {
    Normalizer::new(ScoreThreshold::new(0.5).unwrap())
  }

  #[test]
  fn detection_branch_end_to_end() {
    let detector = FixedDetector {
      raw: RawDetections::new(vec![vec![], vec![[100.0, 50.0, 150.0, 80.0, 0.9]]]),
      calls: Cell::new(0),
    };
    let labels = NamedLabels::new(vec!["all ppe".into(), "no helmet".into()]);
    let model = PpeModel::new(
      detector,
      Normalizer::with_labels(ScoreThreshold::new(0.5).unwrap(), labels),
    );

    let frame = Frame::new(RgbImage::new(200, 100), 0, "f");
    let result = model.infer(&frame).unwrap();
    assert_eq!(result.labels(), &["no helmet".to_string()]);
    assert_eq!(result.boxes()[0], [0.5, 0.5, 0.75, 0.8]);

    model.infer(&frame).unwrap();
    assert_eq!(model.detector().calls.get(), 2);
  }

  #[test]
  fn segmentation_branch_uses_frame_size() {
    let raw = RawSegmentations::new(
      RawDetections::new(vec![vec![[0.0, 0.0, 3.0, 2.0, 0.6]]]),
      vec![vec![Array2::ones((2, 3))]],
    )
    .unwrap();
    let model = PpeModel::new(
      FixedDetector {
        raw,
        calls: Cell::new(0),
      },
      normalizer(),
    );

    let result = model.infer(&Frame::new(RgbImage::new(3, 2), 0, "f")).unwrap();
    assert_eq!(result.masks().dim(), (1, 2, 3));

    // 帧尺寸与掩码不符时快速失败
    let err = model
      .infer(&Frame::new(RgbImage::new(2, 3), 0, "f"))
      .unwrap_err();
    assert!(matches!(
      err,
      PpeModelError::Postprocess(PostprocessError::MaskShapeMismatch { .. })
    ));
  }

  #[test]
  fn invalid_detector_records_fail_postprocess() {
    let model = PpeModel::new(
      FixedDetector {
        raw: RawDetections::new(vec![vec![
          [10.0, 10.0, 20.0, 20.0, 0.9],
          [f32::NAN, 0.0, f32::INFINITY, 20.0, 0.9],
        ]]),
        calls: Cell::new(0),
      },
      Normalizer::new(ScoreThreshold::new(0.0).unwrap()),
    );
    assert_eq!(model.normalizer().threshold().value(), 0.0);

    let err = model
      .infer(&Frame::new(RgbImage::new(100, 100), 0, "f"))
      .unwrap_err();
    assert!(matches!(
      err,
      PpeModelError::Postprocess(PostprocessError::NonFiniteCoordinate { class: 0, index: 1 })
    ));
  }

  #[test]
  fn out_of_range_scores_fail_postprocess() {
    let model = PpeModel::new(
      FixedDetector {
        raw: RawDetections::new(vec![vec![[10.0, 10.0, 20.0, 20.0, 1.5]]]),
        calls: Cell::new(0),
      },
      normalizer(),
    );
    let err = model
      .infer(&Frame::new(RgbImage::new(100, 100), 0, "f"))
      .unwrap_err();
    assert!(matches!(
      err,
      PpeModelError::Postprocess(PostprocessError::InvalidScore { value, .. }) if value == 1.5
    ));
  }

  #[test]
  fn detector_errors_are_wrapped() {
    let model = PpeModel::new(FailingDetector, normalizer());
    let err = model
      .infer(&Frame::new(RgbImage::new(8, 8), 0, "f"))
      .unwrap_err();
    assert!(matches!(err, PpeModelError::Detector(_)));
  }

  #[test]
  fn empty_frame_is_rejected_before_detection() {
    let model = PpeModel::new(
      FixedDetector {
        raw: RawDetections::default(),
        calls: Cell::new(0),
      },
      normalizer(),
    );
    let err = model.infer(&Frame::from(RgbImage::new(0, 0))).unwrap_err();
    assert!(matches!(
      err,
      PpeModelError::Postprocess(PostprocessError::InvalidImageSize { .. })
    ));
    assert_eq!(model.detector().calls.get(), 0);
  }
}
