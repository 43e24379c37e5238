// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/coco_split.rs - COCO 数据集划分
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

use shanan_ppe::dataset::{CocoDataset, SplitConfig, split_images, write_splits};

/// 将 COCO 标注划分为训练、验证、测试集
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 全部标注文件
  #[arg(long, value_name = "FILE")]
  pub annotations: PathBuf,
  /// 原始图像目录
  #[arg(long, value_name = "DIR")]
  pub images: PathBuf,
  /// 输出根目录
  #[arg(long, value_name = "DIR")]
  pub root: PathBuf,

  #[arg(long, default_value = "2022")]
  pub seed: u64,
  #[arg(long, default_value = "0.7")]
  pub train: f64,
  #[arg(long, default_value = "0.2")]
  pub val: f64,
  #[arg(long, default_value = "0.1")]
  pub test: f64,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = SplitConfig {
    seed: args.seed,
    train_ratio: args.train,
    val_ratio: args.val,
    test_ratio: args.test,
  };
  config.validate()?;

  info!("标注文件: {}", args.annotations.display());
  let dataset = CocoDataset::load(&args.annotations)?;
  let split = split_images(&dataset.images, &config)?;
  write_splits(&dataset, &split, &args.images, &args.root)?;

  Ok(())
}
