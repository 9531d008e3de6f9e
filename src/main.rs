//! 手書き数字分類のCLI
//!
//! 保存済みのキャンバス画像を読み込み、学習済みモデルで数字(0〜9)を
//! 予測してクラス別確率と共に表示します。

use anyhow::{bail, Context, Result};

use digit_classifier::model::AppConfig;
use digit_classifier::{Classification, InferenceEngine};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let json_output = args.iter().any(|a| a == "--json");
    let image_paths: Vec<String> = args.into_iter().filter(|a| !a.starts_with("--")).collect();

    if image_paths.is_empty() {
        bail!("使い方: digit_classifier [--json] <画像ファイル>...");
    }

    let mut config = AppConfig::load_or_default();

    // モデル読み込みの失敗は致命的なのでここで中断する
    let mut engine = InferenceEngine::load(&config.model)
        .with_context(|| format!("モデル: {}", config.model.model_path))?;

    let mut results: Vec<(String, Classification)> = Vec::new();
    for path in &image_paths {
        match engine.classify_image(path) {
            Ok(classification) => {
                if !json_output {
                    print_classification(path, &classification);
                }
                config.update_last_image_path(path);
                results.push((path.clone(), classification));
            }
            Err(e) => {
                // 1枚の失敗はスキップして続行する。エンジンは継続使用できる
                eprintln!("✗ {}: {}", path, e);
            }
        }
    }

    if json_output {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|(path, classification)| {
                serde_json::json!({
                    "path": path,
                    "digit": classification.digit,
                    "probabilities": classification.probabilities,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    if let Err(e) = config.save_default() {
        eprintln!("警告: 設定ファイルの保存に失敗しました: {}", e);
    }

    Ok(())
}

/// 予測結果をコンソールに表示
fn print_classification(path: &str, classification: &Classification) {
    println!("✓ {}", path);
    println!(
        "  予測数字: {} (確率 {:.4})",
        classification.digit,
        classification.confidence()
    );
    println!("  クラス別確率:");
    for (digit, prob) in classification.probabilities.iter().enumerate() {
        println!("    {}: {:.6}", digit, prob);
    }
}
