//! 手書き数字分類ライブラリ
//!
//! キャンバスのRGBAピクセルバッファを28x28の正規化テンソルへ変換し、
//! 学習済みONNXモデルで数字(0〜9)とクラス別確率を求めます。

mod types;

pub mod ml;
pub mod model;

pub use ml::{convert_canvas, InferenceEngine, IMAGE_SIZE, INPUT_LEN, NUM_CLASSES};
pub use types::Classification;

use thiserror::Error;

/// 分類パイプラインのエラー
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// モデルファイルの読み込み・検証の失敗。エンジンは構築されない
    #[error("モデルの読み込みに失敗しました: {0}")]
    ModelLoad(String),

    /// 入力バッファと解像度の不整合。キャンバスの再取得で回復可能
    #[error("入力バッファが不正です: {0}")]
    InvalidInput(String),

    /// 順伝播の実行時失敗。エンジンは以降の呼び出しに継続使用できる
    #[error("推論に失敗しました: {0}")]
    Inference(String),
}
