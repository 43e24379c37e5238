// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_directory.rs - 图像目录输入
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

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{decode_rgb, frame_name},
};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "webp", "gif"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法读取目录 {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// 目录下的全部图像文件，按文件名排序逐帧读取
pub struct DirectoryInput {
  paths: Vec<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DirectoryInputError::SchemeMismatch);
    }
    Self::open(Path::new(url.path()))
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| {
      IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

impl DirectoryInput {
  pub fn open(directory: &Path) -> Result<Self, DirectoryInputError> {
    let io_error = |source| DirectoryInputError::IoError {
      path: directory.to_path_buf(),
      source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if path.is_file() && is_image(&path) {
        paths.push(path);
      }
    }
    paths.sort();

    info!("目录 {} 中共有 {} 张图像", directory.display(), paths.len());
    Ok(Self { paths })
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn into_frames(self) -> DirectoryFrames {
    DirectoryFrames {
      paths: self.paths.into_iter(),
      index: 0,
    }
  }
}

pub struct DirectoryFrames {
  paths: std::vec::IntoIter<PathBuf>,
  index: usize,
}

impl Iterator for DirectoryFrames {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.paths.by_ref() {
      match decode_rgb(&path) {
        Ok(image) => {
          debug!("读取图像 {}", path.display());
          let frame = Frame::new(image, self.index, frame_name(&path));
          self.index += 1;
          return Some(frame);
        }
        Err(e) => {
          error!("无法解码图像 {}: {}, 跳过", path.display(), e);
        }
      }
    }
    None
  }
}
