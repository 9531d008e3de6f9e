//! 推論エンジン
//!
//! 学習済みONNXモデルのセッションと固定サイズの入出力バッファを所有し、
//! 1回の順伝播・softmax・argmaxで数字を予測します。

use std::path::Path;

use anyhow::Result;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;

use crate::ml::converter::{self, IMAGE_SIZE, INPUT_LEN, NUM_CLASSES};
use crate::model::ModelSettings;
use crate::types::Classification;
use crate::ClassifierError;

/// 推論エンジン
///
/// 入力テンソル（1x1x28x28）と確率バッファ（10要素）を固定サイズで
/// 所有し、呼び出しごとに再利用します。入力テンソルへの書き込みは
/// コンバータのみ、出力の書き込みはセッションのみが行います。
pub struct InferenceEngine {
    session: Session,
    input_name: String,
    output_name: String,
    /// 28x28の正規化済み入力テンソル（行優先）
    input_image: Vec<f32>,
    /// 直近の推論のクラス別確率（softmax適用後）
    results: Vec<f32>,
}

impl InferenceEngine {
    /// モデルを読み込んで推論エンジンを初期化
    ///
    /// 設定されたテンソル名がモデルの宣言と一致しない場合、および
    /// 入出力形状が 1x1x28x28 / 1x10 の契約と一致しない場合は
    /// `ModelLoad` で失敗します。
    pub fn load(settings: &ModelSettings) -> Result<Self, ClassifierError> {
        let session = build_session(Path::new(&settings.model_path))
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {}", settings.model_path, e)))?;

        // 設定されたテンソル名がモデルに存在するか検証する
        if !session
            .inputs()
            .iter()
            .any(|input| input.name() == settings.input_name)
        {
            return Err(ClassifierError::ModelLoad(format!(
                "入力テンソル名 '{}' がモデルに存在しません",
                settings.input_name
            )));
        }
        if !session
            .outputs()
            .iter()
            .any(|output| output.name() == settings.output_name)
        {
            return Err(ClassifierError::ModelLoad(format!(
                "出力テンソル名 '{}' がモデルに存在しません",
                settings.output_name
            )));
        }

        let mut engine = Self {
            session,
            input_name: settings.input_name.clone(),
            output_name: settings.output_name.clone(),
            input_image: vec![0.0; INPUT_LEN],
            results: vec![0.0; NUM_CLASSES],
        };

        // ゼロ入力で1回実行し、形状の契約違反を構築時に検出する
        engine
            .run()
            .map_err(|e| ClassifierError::ModelLoad(format!("形状検証に失敗しました: {}", e)))?;

        Ok(engine)
    }

    /// キャンバスのRGBAバッファを分類
    ///
    /// 変換・順伝播・softmax・argmaxを1回の同期呼び出しで行います。
    ///
    /// # 引数
    /// - `pixels`: RGBA8・行優先のピクセルバッファ
    /// - `width`, `height`: バッファの解像度
    ///
    /// # 戻り値
    /// - 予測された数字とクラス別確率
    pub fn classify(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Classification, ClassifierError> {
        converter::convert_canvas(pixels, width, height, &mut self.input_image)?;
        let digit = self.run()?;
        Ok(Classification {
            digit,
            probabilities: self.results.clone(),
        })
    }

    /// キャンバス画像ファイルを読み込んで分類
    pub fn classify_image<P: AsRef<Path>>(&mut self, path: P) -> Result<Classification> {
        let (pixels, width, height) = converter::load_canvas_image(path.as_ref())?;
        Ok(self.classify(&pixels, width, height)?)
    }

    /// 現在の入力テンソルの内容で順伝播を1回実行
    ///
    /// 確率バッファにsoftmax適用後の分布を書き込み、最大確率の
    /// クラスを返します。失敗してもエンジンは継続使用できますが、
    /// 確率バッファの内容は不定になります。
    pub fn run(&mut self) -> Result<usize, ClassifierError> {
        let shape = vec![1_i64, 1, IMAGE_SIZE as i64, IMAGE_SIZE as i64];
        let input_tensor = TensorRef::from_array_view((shape, self.input_image.as_slice()))
            .map_err(|e| {
                ClassifierError::Inference(format!("入力テンソルの作成に失敗しました: {}", e))
            })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Inference(format!("順伝播に失敗しました: {}", e)))?;

        let (output_shape, output_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassifierError::Inference(format!(
                    "出力テンソル '{}' の取得に失敗しました: {}",
                    self.output_name, e
                ))
            })?;

        let dims: Vec<i64> = output_shape.iter().copied().collect();
        if dims != [1, NUM_CLASSES as i64] {
            return Err(ClassifierError::Inference(format!(
                "出力形状が契約と一致しません: {:?} (期待: [1, {}])",
                dims, NUM_CLASSES
            )));
        }

        self.results.copy_from_slice(output_data);
        softmax(&mut self.results);
        Ok(argmax(&self.results))
    }

    /// 直近の推論のクラス別確率
    pub fn probabilities(&self) -> &[f32] {
        &self.results
    }
}

fn build_session(model_path: &Path) -> ort::Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .commit_from_file(model_path)
}

/// 数値的に安定なsoftmax（in place）
///
/// 最大値を引いてから指数化するため、すべての指数が0以下になり、
/// 大きなロジットでもオーバーフローしません。
fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// 最大値のインデックスを返す。同値の場合は最小のインデックス
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
