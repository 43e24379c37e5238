// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dataset/coco.rs - COCO 标注文件
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
  io::{BufReader, BufWriter, Write},
  path::Path,
};

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};
use tracing::debug;

use super::DatasetError;

/// 标注工具导出的 id 可能是数字字符串，读取时统一转为整数，写出时为数字
fn coco_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Number(u64),
    Text(String),
  }

  match RawId::deserialize(deserializer)? {
    RawId::Number(id) => Ok(id),
    RawId::Text(text) => text
      .trim()
      .parse()
      .map_err(|_| D::Error::custom(format!("无效的 id: {text:?}"))),
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
  #[serde(deserialize_with = "coco_id")]
  pub id: u64,
  pub file_name: String,
  /// 宽高、拍摄时间等其余字段原样保留
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
  #[serde(deserialize_with = "coco_id")]
  pub image_id: u64,
  #[serde(deserialize_with = "coco_id")]
  pub category_id: u64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
  #[serde(deserialize_with = "coco_id")]
  pub id: u64,
  pub name: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
  pub images: Vec<CocoImage>,
  pub annotations: Vec<CocoAnnotation>,
  pub categories: Vec<CocoCategory>,
}

impl CocoDataset {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let dataset: Self =
      serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
      })?;
    debug!(
      "读取 {}: {} 张图像, {} 个标注, {} 个类别",
      path.display(),
      dataset.images.len(),
      dataset.annotations.len(),
      dataset.categories.len()
    );
    Ok(dataset)
  }

  /// 以两空格缩进写出，键按字典序排列
  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let json_err = |source| DatasetError::Json {
      path: path.to_path_buf(),
      source,
    };
    let io_err = |source| DatasetError::Io {
      path: path.to_path_buf(),
      source,
    };

    // Value 的对象以 BTreeMap 存储，经此一转键即有序
    let value = serde_json::to_value(self).map_err(json_err)?;
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, &value).map_err(json_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
  }
}
