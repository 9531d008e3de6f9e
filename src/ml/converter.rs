//! キャンバスからモデル入力テンソルへの変換
//!
//! 任意解像度のRGBAバッファを28x28の単チャネルテンソルへ
//! 最近傍法で縮小します。補間は行いません。

use std::path::Path;

use anyhow::{Context, Result};

use crate::ClassifierError;

/// モデル入力の一辺のピクセル数
pub const IMAGE_SIZE: usize = 28;

/// 分類クラス数（数字0〜9）
pub const NUM_CLASSES: usize = 10;

/// 入力テンソルの要素数（28x28）
pub const INPUT_LEN: usize = IMAGE_SIZE * IMAGE_SIZE;

/// RGBAの1ピクセルあたりバイト数
const BYTES_PER_PIXEL: usize = 4;

/// RGBAバッファを28x28の正規化テンソルへ変換
///
/// 各出力セルに対して最近傍の1ピクセルを選び、RGB平均の輝度を
/// 反転して `[0.0, 1.0]` に正規化します（1.0 = 黒いストローク、
/// 0.0 = 白い背景）。書き込み前に `dest` 全体をゼロ埋めするため、
/// 前回の描画が残りません。検証に失敗した場合 `dest` は変更されません。
///
/// # 引数
/// - `pixels`: RGBA8・行優先のピクセルバッファ（読み取り専用）
/// - `width`, `height`: バッファの解像度（どちらも1以上）
/// - `dest`: エンジンが所有する長さ784の入力テンソル
pub fn convert_canvas(
    pixels: &[u8],
    width: u32,
    height: u32,
    dest: &mut [f32],
) -> Result<(), ClassifierError> {
    if width == 0 || height == 0 {
        return Err(ClassifierError::InvalidInput(format!(
            "解像度が不正です: {}x{}",
            width, height
        )));
    }

    let (width, height) = (width as usize, height as usize);
    let expected_len = width * height * BYTES_PER_PIXEL;
    if pixels.len() != expected_len {
        return Err(ClassifierError::InvalidInput(format!(
            "バッファ長が解像度と一致しません: {}バイト (期待: {}x{}x4 = {}バイト)",
            pixels.len(),
            width,
            height,
            expected_len
        )));
    }
    if dest.len() != INPUT_LEN {
        return Err(ClassifierError::InvalidInput(format!(
            "入力テンソル長が不正です: {} (期待: {})",
            dest.len(),
            INPUT_LEN
        )));
    }

    dest.fill(0.0);

    for row in 0..IMAGE_SIZE {
        for col in 0..IMAGE_SIZE {
            // 最近傍法: 整数除算の切り捨てで元ピクセルを1つ選択する。
            // 入力が28より小さい場合は同一ピクセルの重複サンプリングになる
            let src_y = row * height / IMAGE_SIZE;
            let src_x = col * width / IMAGE_SIZE;
            let idx = (src_y * width + src_x) * BYTES_PER_PIXEL;

            let r = pixels[idx] as f32;
            let g = pixels[idx + 1] as f32;
            let b = pixels[idx + 2] as f32;

            // 輝度はRGBの単純平均。学習時の規約のため加重平均へ変更しないこと
            let val = (r + g + b) / 3.0;
            dest[row * IMAGE_SIZE + col] = (255.0 - val) / 255.0;
        }
    }

    Ok(())
}

/// キャンバス画像ファイルをRGBAバッファとして読み込む
///
/// # 戻り値
/// - (RGBA8バイト列, 幅, 高さ)
pub fn load_canvas_image(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let img = image::open(path)
        .with_context(|| format!("画像の読み込みに失敗しました: {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok((img.into_raw(), width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 指定色で塗りつぶしたRGBAバッファを作成
    fn solid_buffer(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            buf.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        buf
    }

    #[test]
    fn test_all_black_canvas_is_fully_inked() {
        let pixels = solid_buffer(280, 224, [0, 0, 0]);
        let mut dest = vec![0.5; INPUT_LEN];
        convert_canvas(&pixels, 280, 224, &mut dest).unwrap();
        assert!(dest.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_all_white_canvas_is_blank() {
        let pixels = solid_buffer(112, 112, [255, 255, 255]);
        let mut dest = vec![0.5; INPUT_LEN];
        convert_canvas(&pixels, 112, 112, &mut dest).unwrap();
        assert!(dest.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let width = 100u32;
        let height = 60u32;
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 255 / width) as u8).wrapping_add(y as u8);
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let mut first = vec![0.0; INPUT_LEN];
        let mut second = vec![0.0; INPUT_LEN];
        convert_canvas(&pixels, width, height, &mut first).unwrap();
        convert_canvas(&pixels, width, height, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_checkerboard_downscale() {
        // 2x2ブロックの市松模様 56x56。各出力セル(row, col)は
        // 元画像の(2*row, 2*col)、つまりブロック(row, col)の左上を選ぶ
        let width = 56usize;
        let mut pixels = Vec::with_capacity(width * width * 4);
        for y in 0..width {
            for x in 0..width {
                let black = ((x / 2) + (y / 2)) % 2 == 0;
                let v = if black { 0u8 } else { 255u8 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let mut dest = vec![0.0; INPUT_LEN];
        convert_canvas(&pixels, 56, 56, &mut dest).unwrap();
        for row in 0..IMAGE_SIZE {
            for col in 0..IMAGE_SIZE {
                let expected = if (row + col) % 2 == 0 { 1.0 } else { 0.0 };
                assert_eq!(dest[row * IMAGE_SIZE + col], expected, "cell ({}, {})", row, col);
            }
        }
    }

    #[test]
    fn test_source_smaller_than_output() {
        // 4x4の入力では複数の出力セルが同一ピクセルを重複サンプリングする。
        // src_y = row * 4 / 28 なので row 0..7 が元画像のy=0に対応する
        let mut pixels = solid_buffer(4, 4, [255, 255, 255]);
        pixels[0] = 0;
        pixels[1] = 0;
        pixels[2] = 0;

        let mut dest = vec![0.0; INPUT_LEN];
        convert_canvas(&pixels, 4, 4, &mut dest).unwrap();
        for row in 0..IMAGE_SIZE {
            for col in 0..IMAGE_SIZE {
                let expected = if row < 7 && col < 7 { 1.0 } else { 0.0 };
                assert_eq!(dest[row * IMAGE_SIZE + col], expected, "cell ({}, {})", row, col);
            }
        }
    }

    #[test]
    fn test_length_mismatch_leaves_tensor_untouched() {
        // 10x10なら400バイト必要
        let pixels = vec![0u8; 100];
        let mut dest = vec![0.25; INPUT_LEN];
        let result = convert_canvas(&pixels, 10, 10, &mut dest);
        assert!(matches!(result, Err(ClassifierError::InvalidInput(_))));
        assert!(dest.iter().all(|&v| v == 0.25));
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        let mut dest = vec![0.0; INPUT_LEN];
        let result = convert_canvas(&[], 0, 28, &mut dest);
        assert!(matches!(result, Err(ClassifierError::InvalidInput(_))));
    }
}
