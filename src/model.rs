// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use crate::frame::Frame;

/// 流水线中的推理节点：输入一帧，输出可供下游消费的结果
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 检测器适配器：对解码后的图像运行检测，返回按类别组织的原始预测
///
/// 检测器在启动时构造一次，之后在每一帧上复用。
pub trait Detector {
  type Raw;
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, frame: &Frame) -> Result<Self::Raw, Self::Error>;
}

mod label;
mod postprocess;
mod ppe;
mod raw;
mod replay;
mod result;

pub use self::label::{ClassLabel, IndexLabel, LabelError, NamedLabels};
pub use self::postprocess::{ImageSize, Normalizer, Postprocess, PostprocessError, ScoreThreshold};
pub use self::ppe::{PpeModel, PpeModelError};
pub use self::raw::{DetectionRecord, RawDetections, RawSegmentations};
pub use self::replay::{ReplayDetector, ReplayError};
pub use self::result::{AsDetectResult, DetectItemRef, DetectResult, SegmentResult};
