// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 推理任务
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

use std::{sync::mpsc, thread, time::Duration};
use tracing::{info, warn};

use crate::{model::AsDetectResult, model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<TaskSummary, Self::Error>;
}

/// 任务结束后的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
  pub frames: usize,
  pub detections: usize,
}

pub struct OneShotTask;

impl<
  F,
  D: AsDetectResult,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    let detections = result.detect_result().len();
    info!(
      "推理完成，检测到 {} 个实例，耗时: {:.2?}",
      detections, elapsed
    );
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(TaskSummary {
      frames: 1,
      detections,
    })
  }
}

#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  install_ctrlc: bool,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      install_ctrlc: true,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 是否注册 Ctrl-C 处理函数，一个进程只能注册一次
  pub fn with_ctrlc(mut self, install: bool) -> Self {
    self.install_ctrlc = install;
    self
  }

  fn interrupt_channel(&self) -> Result<mpsc::Receiver<()>, ctrlc::Error> {
    let (tx, rx) = mpsc::channel();
    if self.install_ctrlc {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }
    Ok(rx)
  }
}

impl<
  F,
  D: AsDetectResult,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let rx = self.interrupt_channel()?;

    let mut summary = TaskSummary::default();
    let mut now = std::time::Instant::now();
    for frame in input {
      summary.frames += 1;
      info!("处理第 {} 帧图像", summary.frames);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      let detections = result.detect_result().len();
      summary.detections += detections;
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = std::time::Instant::now();
      info!(
        "检测到 {} 个实例，推理完成，耗时: {:.2?} / {:.2?}",
        detections, elapsed_a, elapsed_b
      );
      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，检测到 {} 个实例",
      summary.frames, summary.detections
    );
    Ok(summary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::Frame,
    model::{Detector, Normalizer, PpeModel, RawDetections, ScoreThreshold},
  };
  use image::RgbImage;
  use std::cell::RefCell;

  struct StaticDetector;

  impl Detector for StaticDetector {
    type Raw = RawDetections;
    type Error = std::io::Error;

    fn detect(&self, frame: &Frame) -> Result<RawDetections, Self::Error> {
      // 每帧的实例数等于帧序号
      let records = (0..frame.index())
        .map(|_| [0.0, 0.0, 1.0, 1.0, 0.9])
        .collect();
      Ok(RawDetections::new(vec![records]))
    }
  }

  #[derive(Default)]
  struct CollectOutput {
    seen: RefCell<Vec<(usize, usize)>>,
  }

  impl<D: AsDetectResult> Render<Frame, D> for &CollectOutput {
    type Error = std::io::Error;

    fn render_result(&self, frame: &Frame, result: &D) -> Result<(), Self::Error> {
      self
        .seen
        .borrow_mut()
        .push((frame.index(), result.detect_result().len()));
      Ok(())
    }
  }

  fn model() -> PpeModel<StaticDetector> {
    PpeModel::new(
      StaticDetector,
      Normalizer::new(ScoreThreshold::new(0.5).unwrap()),
    )
  }

  fn frames(n: usize) -> impl Iterator<Item = Frame> {
    (0..n).map(|i| Frame::new(RgbImage::new(4, 4), i, format!("f{i}")))
  }

  #[test]
  fn one_shot_processes_first_frame_only() {
    let output = CollectOutput::default();
    let summary = OneShotTask.run_task(frames(3), model(), &output).unwrap();
    assert_eq!(
      summary,
      TaskSummary {
        frames: 1,
        detections: 0
      }
    );
    assert_eq!(*output.seen.borrow(), vec![(0, 0)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let output = CollectOutput::default();
    assert!(OneShotTask.run_task(frames(0), model(), &output).is_err());
  }

  #[test]
  fn continuous_runs_every_frame_in_order() {
    let output = CollectOutput::default();
    let summary = ContinuousTask::default()
      .with_ctrlc(false)
      .run_task(frames(4), model(), &output)
      .unwrap();
    assert_eq!(
      summary,
      TaskSummary {
        frames: 4,
        detections: 6
      }
    );
    assert_eq!(*output.seen.borrow(), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
  }

  #[test]
  fn continuous_honours_frame_limit() {
    let output = CollectOutput::default();
    let summary = ContinuousTask::default()
      .with_ctrlc(false)
      .with_frame_number(Some(2))
      .run_task(frames(10), model(), &output)
      .unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(output.seen.borrow().len(), 2);
  }

  #[test]
  fn continuous_stops_on_model_error() {
    let output = CollectOutput::default();
    let bad_frames = (0..3).map(|i| {
      let size = if i == 1 { 0 } else { 4 };
      Frame::new(RgbImage::new(size, size), i, "f")
    });
    let result = ContinuousTask::default()
      .with_ctrlc(false)
      .run_task(bad_frames, model(), &output);
    assert!(result.is_err());
    assert_eq!(output.seen.borrow().len(), 1);
  }
}
