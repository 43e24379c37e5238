// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/coco_count.rs - COCO 类别实例统计
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_ppe::dataset::{CocoDataset, count_categories};

/// 统计 COCO 标注中每个类别的实例数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[arg(long, value_name = "FILE")]
  pub annotations: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let dataset = CocoDataset::load(&args.annotations)?;
  let counts = count_categories(&dataset);

  info!("类别数: {}", counts.len());
  for (name, count) in &counts {
    info!("  {}: {}", name, count);
  }
  println!("{}", serde_json::to_string(&counts)?);

  Ok(())
}
