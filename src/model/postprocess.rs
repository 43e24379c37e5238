// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/postprocess.rs - 检测结果后处理（阈值过滤与坐标归一化）
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

use ndarray::{Array3, Axis};
use thiserror::Error;
use tracing::debug;

use crate::model::{
  ClassLabel, DetectResult, DetectionRecord, IndexLabel, RawDetections, RawSegmentations,
  SegmentResult,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  #[error("置信度阈值必须位于 [0, 1] 区间内, 实际为 {0}")]
  InvalidThreshold(f32),
  #[error("图像尺寸必须为正数, 实际为 {width}x{height}")]
  InvalidImageSize { width: u32, height: u32 },
  #[error("类别 {class} 第 {index} 条检测记录格式错误: 期望 5 个数值, 实际为 {found} 个")]
  MalformedRecord {
    class: usize,
    index: usize,
    found: usize,
  },
  #[error("类别 {class} 第 {index} 条检测记录的置信度 {value} 不在 [0, 1] 区间内")]
  InvalidScore {
    class: usize,
    index: usize,
    value: f32,
  },
  #[error("类别 {class} 第 {index} 条检测记录的坐标不是有限数值")]
  NonFiniteCoordinate { class: usize, index: usize },
  #[error("检测记录包含 {records} 个类别, 掩码包含 {masks} 个类别")]
  ClassCountMismatch { records: usize, masks: usize },
  #[error("类别 {class} 的检测记录数 {records} 与掩码数 {masks} 不一致")]
  MaskCountMismatch {
    class: usize,
    records: usize,
    masks: usize,
  },
  #[error("类别 {class} 第 {index} 个掩码的行长度不一致")]
  RaggedMask { class: usize, index: usize },
  #[error("类别 {class} 第 {index} 个掩码尺寸错误: 期望 {expected:?}, 实际为 {found:?}")]
  MaskShapeMismatch {
    class: usize,
    index: usize,
    expected: (usize, usize),
    found: (usize, usize),
  },
}

/// 置信度阈值，比较是包含式的 (`score >= threshold`)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ScoreThreshold(f32);

impl ScoreThreshold {
  pub fn new(threshold: f32) -> Result<Self, PostprocessError> {
    if (0.0..=1.0).contains(&threshold) {
      Ok(Self(threshold))
    } else {
      Err(PostprocessError::InvalidThreshold(threshold))
    }
  }

  pub fn value(&self) -> f32 {
    self.0
  }

  pub fn accepts(&self, score: f32) -> bool {
    score >= self.0
  }
}

/// 图像像素尺寸，宽高均为正数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
  width: u32,
  height: u32,
}

impl ImageSize {
  pub fn new(width: u32, height: u32) -> Result<Self, PostprocessError> {
    if width == 0 || height == 0 {
      return Err(PostprocessError::InvalidImageSize { width, height });
    }
    Ok(Self { width, height })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 单个掩码平面的形状，轴顺序固定为 (height, width)
  pub fn mask_dim(&self) -> (usize, usize) {
    (self.height as usize, self.width as usize)
  }

  fn normalize(&self, record: &DetectionRecord) -> [f32; 4] {
    let (w, h) = (self.width as f32, self.height as f32);
    [record[0] / w, record[1] / h, record[2] / w, record[3] / h]
  }
}

/// 将检测器原始输出整理为统一结果：按阈值过滤、坐标归一化、类别映射为标签
#[derive(Debug, Clone)]
pub struct Normalizer<L = IndexLabel> {
  threshold: ScoreThreshold,
  labels: L,
}

impl Normalizer<IndexLabel> {
  pub fn new(threshold: ScoreThreshold) -> Self {
    Self {
      threshold,
      labels: IndexLabel,
    }
  }
}

impl<L: ClassLabel> Normalizer<L> {
  pub fn with_labels(threshold: ScoreThreshold, labels: L) -> Self {
    Self { threshold, labels }
  }

  pub fn threshold(&self) -> ScoreThreshold {
    self.threshold
  }

  fn retained<'a>(
    &'a self,
    raw: &'a RawDetections,
  ) -> impl Iterator<Item = (usize, usize, &'a DetectionRecord)> + 'a {
    raw
      .records()
      .filter(move |(_, _, record)| self.threshold.accepts(record[4]))
  }

  pub fn normalize_detections(&self, raw: &RawDetections, size: ImageSize) -> DetectResult {
    let mut result = DetectResult::with_capacity(raw.num_records());
    for (class, _, record) in self.retained(raw) {
      result.push(size.normalize(record), self.labels.label(class), record[4]);
    }

    debug!(
      "保留 {} / {} 个检测实例 (阈值 {})",
      result.len(),
      raw.num_records(),
      self.threshold.value()
    );
    result
  }

  pub fn normalize_segmentations(
    &self,
    raw: &RawSegmentations,
    size: ImageSize,
  ) -> Result<SegmentResult, PostprocessError> {
    let (height, width) = size.mask_dim();
    raw.check_mask_shapes((height, width))?;

    let kept: Vec<_> = self.retained(raw.detections()).collect();
    // 空结果与非空结果共用同一个形状表达式
    let mut masks = Array3::<u8>::zeros((kept.len(), height, width));
    let mut result = DetectResult::with_capacity(kept.len());

    for (slot, (class, index, record)) in kept.into_iter().enumerate() {
      if let Some(mask) = raw.mask(class, index) {
        masks.index_axis_mut(Axis(0), slot).assign(mask);
      }
      result.push(size.normalize(record), self.labels.label(class), record[4]);
    }

    debug!(
      "保留 {} / {} 个分割实例 (阈值 {}), 掩码形状 {:?}",
      result.len(),
      raw.detections().num_records(),
      self.threshold.value(),
      masks.shape()
    );
    Ok(SegmentResult::new(result, masks))
  }
}

/// 原始输出到归一化结果的转换，由原始输出类型决定走检测还是分割分支
pub trait Postprocess {
  type Output;

  fn postprocess<L: ClassLabel>(
    &self,
    normalizer: &Normalizer<L>,
    size: ImageSize,
  ) -> Result<Self::Output, PostprocessError>;
}

impl Postprocess for RawDetections {
  type Output = DetectResult;

  fn postprocess<L: ClassLabel>(
    &self,
    normalizer: &Normalizer<L>,
    size: ImageSize,
  ) -> Result<Self::Output, PostprocessError> {
    self.validate()?;
    Ok(normalizer.normalize_detections(self, size))
  }
}

impl Postprocess for RawSegmentations {
  type Output = SegmentResult;

  fn postprocess<L: ClassLabel>(
    &self,
    normalizer: &Normalizer<L>,
    size: ImageSize,
  ) -> Result<Self::Output, PostprocessError> {
    self.detections().validate()?;
    normalizer.normalize_segmentations(self, size)
  }
}
