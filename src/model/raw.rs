// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/raw.rs - 检测器原始输出
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

use ndarray::Array2;
use serde::Deserialize;

use crate::model::PostprocessError;

const RECORD_FIELDS: usize = 5;

/// 单个实例的检测记录 [x1, y1, x2, y2, confidence]，坐标为绝对像素
pub type DetectionRecord = [f32; RECORD_FIELDS];

/// 目标检测的原始输出：下标为类别序号，每个类别按检测器输出顺序保存实例
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Vec<Vec<f32>>>")]
pub struct RawDetections {
  classes: Vec<Vec<DetectionRecord>>,
}

impl RawDetections {
  pub fn new(classes: Vec<Vec<DetectionRecord>>) -> Self {
    Self { classes }
  }

  /// 从未定型的数值行构造，每条记录必须恰好包含 5 个数值，坐标有限且置信度位于 [0, 1]
  pub fn try_from_rows(rows: Vec<Vec<Vec<f32>>>) -> Result<Self, PostprocessError> {
    let mut classes = Vec::with_capacity(rows.len());
    for (class, instances) in rows.into_iter().enumerate() {
      let mut records = Vec::with_capacity(instances.len());
      for (index, values) in instances.into_iter().enumerate() {
        let record: DetectionRecord =
          values
            .as_slice()
            .try_into()
            .map_err(|_| PostprocessError::MalformedRecord {
              class,
              index,
              found: values.len(),
            })?;
        check_record(class, index, &record)?;
        records.push(record);
      }
      classes.push(records);
    }
    Ok(Self { classes })
  }

  /// 检查 `new` 构造的记录，规则与 `try_from_rows` 相同
  pub fn validate(&self) -> Result<(), PostprocessError> {
    self
      .records()
      .try_for_each(|(class, index, record)| check_record(class, index, record))
  }

  pub fn num_classes(&self) -> usize {
    self.classes.len()
  }

  pub fn num_records(&self) -> usize {
    self.classes.iter().map(Vec::len).sum()
  }

  pub fn class(&self, class: usize) -> &[DetectionRecord] {
    self.classes.get(class).map(Vec::as_slice).unwrap_or_default()
  }

  /// 按类别升序、类别内按检测器输出顺序遍历 (class, index, record)
  pub fn records(&self) -> impl Iterator<Item = (usize, usize, &DetectionRecord)> {
    self.classes.iter().enumerate().flat_map(|(class, records)| {
      records
        .iter()
        .enumerate()
        .map(move |(index, record)| (class, index, record))
    })
  }
}

fn check_record(
  class: usize,
  index: usize,
  record: &DetectionRecord,
) -> Result<(), PostprocessError> {
  if !record[..4].iter().all(|v| v.is_finite()) {
    return Err(PostprocessError::NonFiniteCoordinate { class, index });
  }
  // NaN 不落在区间内
  let score = record[4];
  if !(0.0..=1.0).contains(&score) {
    return Err(PostprocessError::InvalidScore {
      class,
      index,
      value: score,
    });
  }
  Ok(())
}

impl TryFrom<Vec<Vec<Vec<f32>>>> for RawDetections {
  type Error = PostprocessError;

  fn try_from(rows: Vec<Vec<Vec<f32>>>) -> Result<Self, Self::Error> {
    Self::try_from_rows(rows)
  }
}

/// 实例分割的原始输出：检测记录与逐实例掩码按位置一一对应
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "SegmentationDump")]
pub struct RawSegmentations {
  detections: RawDetections,
  masks: Vec<Vec<Array2<u8>>>,
}

impl RawSegmentations {
  pub fn new(
    detections: RawDetections,
    masks: Vec<Vec<Array2<u8>>>,
  ) -> Result<Self, PostprocessError> {
    if detections.num_classes() != masks.len() {
      return Err(PostprocessError::ClassCountMismatch {
        records: detections.num_classes(),
        masks: masks.len(),
      });
    }
    for (class, class_masks) in masks.iter().enumerate() {
      let records = detections.class(class).len();
      if records != class_masks.len() {
        return Err(PostprocessError::MaskCountMismatch {
          class,
          records,
          masks: class_masks.len(),
        });
      }
    }
    Ok(Self { detections, masks })
  }

  pub fn detections(&self) -> &RawDetections {
    &self.detections
  }

  pub fn mask(&self, class: usize, index: usize) -> Option<&Array2<u8>> {
    self.masks.get(class).and_then(|masks| masks.get(index))
  }

  /// 校验所有掩码（包括将被过滤的实例）的形状均为 (height, width)
  pub(crate) fn check_mask_shapes(&self, expected: (usize, usize)) -> Result<(), PostprocessError> {
    for (class, class_masks) in self.masks.iter().enumerate() {
      for (index, mask) in class_masks.iter().enumerate() {
        if mask.dim() != expected {
          return Err(PostprocessError::MaskShapeMismatch {
            class,
            index,
            expected,
            found: mask.dim(),
          });
        }
      }
    }
    Ok(())
  }
}

/// 实例分割检测器导出的 JSON 结构
#[derive(Debug, Deserialize)]
struct SegmentationDump {
  bboxes: Vec<Vec<Vec<f32>>>,
  masks: Vec<Vec<Vec<Vec<u8>>>>,
}

impl TryFrom<SegmentationDump> for RawSegmentations {
  type Error = PostprocessError;

  fn try_from(dump: SegmentationDump) -> Result<Self, Self::Error> {
    let detections = RawDetections::try_from_rows(dump.bboxes)?;
    let masks = dump
      .masks
      .into_iter()
      .enumerate()
      .map(|(class, class_masks)| {
        class_masks
          .into_iter()
          .enumerate()
          .map(|(index, rows)| mask_from_rows(rows, class, index))
          .collect::<Result<Vec<_>, _>>()
      })
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(detections, masks)
  }
}

fn mask_from_rows(
  rows: Vec<Vec<u8>>,
  class: usize,
  index: usize,
) -> Result<Array2<u8>, PostprocessError> {
  let height = rows.len();
  let width = rows.first().map_or(0, Vec::len);
  if rows.iter().any(|row| row.len() != width) {
    return Err(PostprocessError::RaggedMask { class, index });
  }
  let data: Vec<u8> = rows.into_iter().flatten().collect();
  Array2::from_shape_vec((height, width), data)
    .map_err(|_| PostprocessError::RaggedMask { class, index })
}
