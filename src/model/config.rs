//! アプリケーション設定管理モジュール
//!
//! モデルパスやテンソル名などをJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// モデル設定
///
/// テンソル名は学習済みモデルのエクスポート規約の一部であり、
/// 実行時に推測せず設定として注入します。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    /// 使用するモデルファイルのパス
    pub model_path: String,
    /// モデルの入力テンソル名（形状 1x1x28x28、f32）
    pub input_name: String,
    /// モデルの出力テンソル名（形状 1x10、f32）
    pub output_name: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/mnist.onnx".to_string(),
            input_name: "Input3".to_string(),
            output_name: "Plus214_Output_0".to_string(),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// モデル設定
    pub model: ModelSettings,
    /// 最後に分類した画像のパス
    #[serde(default)]
    pub last_image_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            last_image_path: None,
        }
    }
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む、存在しない場合はデフォルト設定を返す
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "警告: 設定ファイルの読み込みに失敗しました ({}): {}",
                        path.display(),
                        e
                    );
                    eprintln!("デフォルト設定を使用します");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// デフォルトパスに設定を保存する
    pub fn save_default(&self) -> anyhow::Result<()> {
        self.save(Self::default_path())
    }

    /// 最後に分類した画像のパスを更新
    pub fn update_last_image_path<P: AsRef<Path>>(&mut self, path: P) {
        self.last_image_path = Some(path.as_ref().to_string_lossy().to_string());
    }

    /// 設定情報を表示
    pub fn display(&self) {
        println!("=== アプリケーション設定 ===");
        println!("モデルパス: {}", self.model.model_path);
        println!("入力テンソル名: {}", self.model.input_name);
        println!("出力テンソル名: {}", self.model.output_name);
        if let Some(ref image) = self.last_image_path {
            println!("最後に分類した画像: {}", image);
        }
        println!("========================");
    }
}
