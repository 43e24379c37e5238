// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dataset/count.rs - 类别实例计数
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

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::CocoDataset;

/// 按类别名统计标注数量，未知类别 id 的标注不计入
pub fn count_categories(dataset: &CocoDataset) -> BTreeMap<String, usize> {
  let names: HashMap<u64, &str> = dataset
    .categories
    .iter()
    .map(|category| (category.id, category.name.as_str()))
    .collect();

  let mut counts = BTreeMap::new();
  for annotation in &dataset.annotations {
    match names.get(&annotation.category_id) {
      Some(name) => *counts.entry(name.to_string()).or_insert(0) += 1,
      None => debug!("跳过未知类别 {}", annotation.category_id),
    }
  }
  counts
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_by_category_name() {
    let dataset: CocoDataset = serde_json::from_str(
      r#"{
        "images": [],
        "annotations": [
          {"image_id": 1, "category_id": 1},
          {"image_id": 1, "category_id": 2},
          {"image_id": 2, "category_id": 1},
          {"image_id": 2, "category_id": 9}
        ],
        "categories": [
          {"id": 1, "name": "all ppe"},
          {"id": 2, "name": "no helmet"},
          {"id": 3, "name": "no vest"}
        ]
      }"#,
    )
    .unwrap();

    let counts = count_categories(&dataset);
    assert_eq!(counts.len(), 2);
    assert_eq!(counts["all ppe"], 2);
    assert_eq!(counts["no helmet"], 1);
    assert!(!counts.contains_key("no vest"));
  }
}
