// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dataset/split.rs - 训练、验证、测试集划分
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

use std::{collections::HashSet, path::Path};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::info;

use super::{CocoAnnotation, CocoDataset, CocoImage, DatasetError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
  pub seed: u64,
  pub train_ratio: f64,
  pub val_ratio: f64,
  pub test_ratio: f64,
}

impl Default for SplitConfig {
  fn default() -> Self {
    Self {
      seed: 2022,
      train_ratio: 0.7,
      val_ratio: 0.2,
      test_ratio: 0.1,
    }
  }
}

impl SplitConfig {
  pub fn validate(&self) -> Result<(), DatasetError> {
    for (name, value) in [
      ("train", self.train_ratio),
      ("val", self.val_ratio),
      ("test", self.test_ratio),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(DatasetError::InvalidRatio { name, value });
      }
    }
    let sum = self.train_ratio + self.val_ratio + self.test_ratio;
    if (sum - 1.0).abs() > 1e-6 {
      return Err(DatasetError::RatioSum(sum));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSplit {
  pub train: Vec<CocoImage>,
  pub val: Vec<CocoImage>,
  pub test: Vec<CocoImage>,
}

impl DatasetSplit {
  pub fn parts(&self) -> [(&'static str, &[CocoImage]); 3] {
    [
      ("train", self.train.as_slice()),
      ("val", self.val.as_slice()),
      ("test", self.test.as_slice()),
    ]
  }
}

fn ceil_count(n: usize, ratio: f64) -> usize {
  ((n as f64 * ratio).ceil() as usize).min(n)
}

/// 先切出测试集，再从剩余部分按调整后的比例切出验证集
pub fn split_images(
  images: &[CocoImage],
  config: &SplitConfig,
) -> Result<DatasetSplit, DatasetError> {
  config.validate()?;

  let mut shuffled = images.to_vec();
  let mut rng = StdRng::seed_from_u64(config.seed);
  shuffled.shuffle(&mut rng);

  let test_len = ceil_count(shuffled.len(), config.test_ratio);
  let rest = shuffled.split_off(test_len);
  let test = shuffled;

  let remaining = 1.0 - config.test_ratio;
  let val_len = if remaining > 0.0 {
    ceil_count(rest.len(), config.val_ratio / remaining)
  } else {
    0
  };
  let mut val = rest;
  let train = val.split_off(val_len);

  Ok(DatasetSplit { train, val, test })
}

pub fn filter_annotations(
  annotations: &[CocoAnnotation],
  images: &[CocoImage],
) -> Vec<CocoAnnotation> {
  let ids: HashSet<u64> = images.iter().map(|image| image.id).collect();
  annotations
    .iter()
    .filter(|annotation| ids.contains(&annotation.image_id))
    .cloned()
    .collect()
}

/// 将图像复制到 `root/<split>/images`，并写出 `root/<split>/<split>.json`
pub fn write_splits(
  dataset: &CocoDataset,
  split: &DatasetSplit,
  image_dir: impl AsRef<Path>,
  root: impl AsRef<Path>,
) -> Result<(), DatasetError> {
  let image_dir = image_dir.as_ref();
  let root = root.as_ref();

  for (name, images) in split.parts() {
    let split_dir = root.join(name);
    let target_dir = split_dir.join("images");
    std::fs::create_dir_all(&target_dir).map_err(|source| DatasetError::Io {
      path: target_dir.clone(),
      source,
    })?;

    for image in images {
      let from = image_dir.join(&image.file_name);
      let to = target_dir.join(&image.file_name);
      std::fs::copy(&from, &to).map_err(|source| DatasetError::Io { path: from, source })?;
    }
    info!("完成 {} 张 {} 图像", images.len(), name);

    let subset = CocoDataset {
      images: images.to_vec(),
      annotations: filter_annotations(&dataset.annotations, images),
      categories: dataset.categories.clone(),
    };
    subset.save(split_dir.join(format!("{name}.json")))?;
  }

  info!(
    "共保存训练集 {} 张, 验证集 {} 张, 测试集 {} 张, 位于 {}",
    split.train.len(),
    split.val.len(),
    split.test.len(),
    root.display()
  );
  Ok(())
}
