// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - PPE 检测结果可视化
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

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use ndarray::{ArrayView2, Axis};
use thiserror::Error;
use tracing::{debug, info};

use crate::{frame::Frame, model::AsDetectResult};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const SCORE_FONT_SIZE: f32 = 24.0;
const LABEL_TEXT_PADDING: i32 = 4;
const BOX_THICKNESS: i32 = 3;
const MASK_ALPHA: f32 = 0.5;
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const SYSTEM_FONT_PATHS: [&str; 4] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/System/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

/// 由标签文本判断的 PPE 佩戴状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpeStatus {
  /// 全部佩戴
  Compliant,
  /// 缺失两项
  MissingTwo,
  /// 缺失一项
  MissingOne,
  /// 其余情况（包括未识别的标签）
  NonCompliant,
}

impl PpeStatus {
  pub fn from_label(label: &str) -> Self {
    match label {
      "all ppe" => PpeStatus::Compliant,
      "no mask & vest" | "no helmet & vest" | "no helmet & mask" => PpeStatus::MissingTwo,
      "no helmet" | "no vest" | "no mask" => PpeStatus::MissingOne,
      _ => PpeStatus::NonCompliant,
    }
  }

  pub fn color(self) -> Rgb<u8> {
    match self {
      PpeStatus::Compliant => Rgb([0, 255, 0]),
      PpeStatus::MissingTwo => Rgb([255, 100, 0]),
      PpeStatus::MissingOne => Rgb([255, 200, 0]),
      PpeStatus::NonCompliant => Rgb([255, 0, 0]),
    }
  }
}

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件 {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
}

pub struct Draw {
  font: Option<FontVec>,
  label_scale: PxScale,
  score_scale: PxScale,
  thickness: i32,
  show_labels: bool,
}

impl Default for Draw {
  /// 尝试加载系统字体，找不到字体时只绘制边框与掩码
  fn default() -> Self {
    for path in SYSTEM_FONT_PATHS {
      if let Ok(draw) = Self::with_font_path(Path::new(path)) {
        info!("加载系统字体: {}", path);
        return draw;
      }
    }

    debug!("未找到系统字体，跳过文本绘制");
    Self::without_font()
  }
}

impl Draw {
  pub fn without_font() -> Self {
    Self {
      font: None,
      label_scale: PxScale::from(LABEL_FONT_SIZE),
      score_scale: PxScale::from(SCORE_FONT_SIZE),
      thickness: BOX_THICKNESS,
      show_labels: false,
    }
  }

  pub fn with_font_path(path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path).map_err(|source| DrawError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let font =
      FontVec::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.to_path_buf()))?;

    Ok(Self {
      font: Some(font),
      ..Self::without_font()
    })
  }

  pub fn show_labels(mut self, show: bool) -> Self {
    self.show_labels = show;
    self
  }

  /// 在图像上绘制全部实例：先叠加掩码，再绘制边框与文本
  pub fn draw_on_image<R: AsDetectResult>(&self, image: &mut RgbImage, result: &R) {
    let detections = result.detect_result();

    if let Some(masks) = result.masks() {
      for (mask, label) in masks.axis_iter(Axis(0)).zip(detections.labels()) {
        overlay_mask(image, mask, PpeStatus::from_label(label).color());
      }
    }

    for item in detections.iter() {
      let color = PpeStatus::from_label(item.label).color();
      let Some(rect) = project_to_pixels(item.bbox, image.width(), image.height()) else {
        continue;
      };
      self.draw_bbox(image, rect, color);
      if self.show_labels {
        self.draw_label(image, rect, item.label, color);
      }
      self.draw_score(image, rect, item.score, color);
    }
  }

  fn draw_bbox(&self, image: &mut RgbImage, (x1, y1, x2, y2): PixelBox, color: Rgb<u8>) {
    for t in 0..self.thickness {
      let width = x2 - x1 - 2 * t;
      let height = y2 - y1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x1 + t, y1 + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  /// 标签画在边框左上角上方，带填充背景，首字母大写
  fn draw_label(
    &self,
    image: &mut RgbImage,
    (x1, y1, _, _): PixelBox,
    label: &str,
    color: Rgb<u8>,
  ) {
    let Some(font) = &self.font else {
      return;
    };
    let text = capitalize(label);
    let (text_width, text_height) = text_size(self.label_scale, font, &text);
    let background_height = text_height as i32 + LABEL_TEXT_PADDING;
    let top = (y1 - background_height).max(0);

    let rect = Rect::at(x1, top).of_size(text_width.max(1), background_height as u32);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      LABEL_TEXT_COLOR,
      x1,
      top + LABEL_TEXT_PADDING / 2,
      self.label_scale,
      font,
      &text,
    );
  }

  /// 置信度以两位小数写在边框左下角
  fn draw_score(&self, image: &mut RgbImage, (x1, _, _, y2): PixelBox, score: f32, color: Rgb<u8>) {
    let Some(font) = &self.font else {
      return;
    };
    let text = format!("{score:.2}");
    let (_, text_height) = text_size(self.score_scale, font, &text);
    let top = (y2 - text_height as i32).max(0);
    draw_text_mut(image, color, x1, top, self.score_scale, font, &text);
  }
}

/// 像素坐标 (x_min, y_min, x_max, y_max)
type PixelBox = (i32, i32, i32, i32);

/// 把比例坐标投影回像素坐标并裁剪到图像内，退化的框返回 None
fn project_to_pixels(bbox: &[f32; 4], width: u32, height: u32) -> Option<PixelBox> {
  if width == 0 || height == 0 {
    return None;
  }
  let (w, h) = (width as f32, height as f32);
  let max_x = width as i32 - 1;
  let max_y = height as i32 - 1;

  let x1 = ((bbox[0] * w) as i32).clamp(0, max_x);
  let y1 = ((bbox[1] * h) as i32).clamp(0, max_y);
  let x2 = ((bbox[2] * w) as i32).clamp(0, max_x);
  let y2 = ((bbox[3] * h) as i32).clamp(0, max_y);

  (x1 < x2 && y1 < y2).then_some((x1, y1, x2, y2))
}

fn overlay_mask(image: &mut RgbImage, mask: ArrayView2<u8>, color: Rgb<u8>) {
  if mask.dim() != (image.height() as usize, image.width() as usize) {
    debug!(
      "掩码尺寸 {:?} 与图像 {}x{} 不一致，跳过",
      mask.dim(),
      image.width(),
      image.height()
    );
    return;
  }

  for ((y, x), &value) in mask.indexed_iter() {
    if value == 0 {
      continue;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
      let blended = pixel[c] as f32 * (1.0 - MASK_ALPHA) + color[c] as f32 * MASK_ALPHA;
      pixel[c] = blended.round() as u8;
    }
  }
}

fn capitalize(label: &str) -> String {
  let mut chars = label.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

pub trait DrawDetectionOnFrame<R> {
  fn draw_detection(&self, frame: &Frame, result: &R) -> RgbImage;
}

impl<R: AsDetectResult> DrawDetectionOnFrame<R> for Draw {
  fn draw_detection(&self, frame: &Frame, result: &R) -> RgbImage {
    let mut image = frame.image().clone();
    self.draw_on_image(&mut image, result);
    image
  }
}
