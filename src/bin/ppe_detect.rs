// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/ppe_detect.rs - 个人防护装备检测流水线
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
use url::Url;

use shanan_ppe::{
  FromUrl,
  input::InputWrapper,
  model::{
    NamedLabels, Normalizer, PpeModel, RawDetections, RawSegmentations, ReplayDetector,
    ScoreThreshold,
  },
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// PPE 检测结果后处理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测器预测回放路径，例如 replay:///data/predictions
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，image:// 或 folder://
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，image:// 或 folder://
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)，分数不低于该值的实例被保留
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub score_threshold: f32,

  /// 类别名称文件（JSON 数组或每行一个名称）
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 使用实例分割分支，输出包含掩码
  #[arg(long)]
  pub segmentation: bool,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.score_threshold);

  let threshold = ScoreThreshold::new(args.score_threshold)?;
  let labels = match &args.labels {
    Some(path) => NamedLabels::from_path(path)?,
    None => NamedLabels::default(),
  };
  let normalizer = Normalizer::with_labels(threshold, labels);

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let task = ContinuousTask::default().with_frame_number(args.frame_number);

  let summary = if args.segmentation {
    let detector = ReplayDetector::<RawSegmentations>::from_url(&args.model)?;
    task.run_task(
      input.into_frames(),
      PpeModel::new(detector, normalizer),
      output,
    )?
  } else {
    let detector = ReplayDetector::<RawDetections>::from_url(&args.model)?;
    task.run_task(
      input.into_frames(),
      PpeModel::new(detector, normalizer),
      output,
    )?
  };

  info!(
    "处理完成: {} 帧, {} 个实例",
    summary.frames, summary.detections
  );
  Ok(())
}
