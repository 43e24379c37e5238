// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/result.rs - 归一化后的检测结果
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

use ndarray::{Array3, ArrayView2, Axis};
use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeStruct};

/// 单帧的检测结果快照
///
/// `boxes`、`labels`、`scores` 三个序列等长且按位置对应，
/// 坐标为相对图像宽高的比例 [x_min, y_min, x_max, y_max]。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  boxes: Vec<[f32; 4]>,
  labels: Vec<String>,
  scores: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItemRef<'a> {
  pub bbox: &'a [f32; 4],
  pub label: &'a str,
  pub score: f32,
}

impl DetectResult {
  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      boxes: Vec::with_capacity(capacity),
      labels: Vec::with_capacity(capacity),
      scores: Vec::with_capacity(capacity),
    }
  }

  pub(crate) fn push(&mut self, bbox: [f32; 4], label: String, score: f32) {
    self.boxes.push(bbox);
    self.labels.push(label);
    self.scores.push(score);
  }

  pub fn boxes(&self) -> &[[f32; 4]] {
    &self.boxes
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn scores(&self) -> &[f32] {
    &self.scores
  }

  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = DetectItemRef<'_>> {
    self
      .boxes
      .iter()
      .zip(&self.labels)
      .zip(&self.scores)
      .map(|((bbox, label), &score)| DetectItemRef {
        bbox,
        label,
        score,
      })
  }
}

/// 实例分割结果：检测结果加上形状为 (count, height, width) 的掩码堆叠
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentResult {
  detections: DetectResult,
  masks: Array3<u8>,
}

impl SegmentResult {
  pub(crate) fn new(detections: DetectResult, masks: Array3<u8>) -> Self {
    debug_assert_eq!(detections.len(), masks.len_of(Axis(0)));
    Self { detections, masks }
  }

  pub fn detections(&self) -> &DetectResult {
    &self.detections
  }

  pub fn masks(&self) -> &Array3<u8> {
    &self.masks
  }

  pub fn mask(&self, index: usize) -> Option<ArrayView2<'_, u8>> {
    (index < self.masks.len_of(Axis(0))).then(|| self.masks.index_axis(Axis(0), index))
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

impl Serialize for SegmentResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(4))?;
    map.serialize_entry("boxes", self.detections.boxes())?;
    map.serialize_entry("labels", self.detections.labels())?;
    map.serialize_entry("scores", self.detections.scores())?;
    map.serialize_entry("masks", &MaskStack(&self.masks))?;
    map.end()
  }
}

struct MaskStack<'a>(&'a Array3<u8>);

impl Serialize for MaskStack<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("MaskStack", 2)?;
    state.serialize_field("shape", self.0.shape())?;
    state.serialize_field("data", &MaskData(self.0))?;
    state.end()
  }
}

struct MaskData<'a>(&'a Array3<u8>);

impl Serialize for MaskData<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.0.iter())
  }
}

/// 下游节点（绘制、记录）读取结果的统一入口
pub trait AsDetectResult {
  fn detect_result(&self) -> &DetectResult;

  fn masks(&self) -> Option<&Array3<u8>> {
    None
  }
}

impl AsDetectResult for DetectResult {
  fn detect_result(&self) -> &DetectResult {
    self
  }
}

impl AsDetectResult for SegmentResult {
  fn detect_result(&self) -> &DetectResult {
    &self.detections
  }

  fn masks(&self) -> Option<&Array3<u8>> {
    Some(&self.masks)
  }
}
