use serde::{Deserialize, Serialize};

/// 1回の分類結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// 予測された数字 (0〜9)
    pub digit: usize,
    /// クラス別確率。インデックスが数字に対応し、合計は1.0
    pub probabilities: Vec<f32>,
}

impl Classification {
    /// 予測された数字の確率
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.digit]
    }
}
