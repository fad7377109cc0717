// Biology Detect
// 画像を外部のビジョン言語モデルに転送し、生物かどうかの判定結果に正規化するサービス

pub mod classify;
pub mod config;
pub mod detect;
pub mod errors;
pub mod logging;
pub mod normalize;
pub mod prompt;
pub mod vision;
pub mod web;

pub type Result<T> = anyhow::Result<T>;
