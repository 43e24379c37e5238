// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dataset.rs - COCO 数据集工具
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

use std::path::PathBuf;

use thiserror::Error;

mod coco;
mod count;
mod split;

pub use self::coco::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage};
pub use self::count::count_categories;
pub use self::split::{DatasetSplit, SplitConfig, filter_annotations, split_images, write_splits};

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("读取或写入 {path} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("解析或序列化 {path} 失败: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("比例 {name} = {value} 不在 [0, 1] 内")]
  InvalidRatio { name: &'static str, value: f64 },
  #[error("训练、验证、测试比例之和为 {0}，应为 1")]
  RatioSum(f64),
}
