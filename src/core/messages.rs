//! Fixed user-facing strings surfaced through flow and audio notices.
//!
//! These are part of the observable contract (tests assert on them), so they live
//! in one place instead of being scattered through the flows.

pub const INPUT_REQUIRED: &str = "請輸入您想格式化和翻譯的日文句子！";

pub const API_QUOTA: &str = "目前API額度已達上限，請稍後再試。系統已為您建立純文字卡片。";
pub const API_QUOTA_SIMPLE: &str = "目前API額度已達上限，無法取得回饋。";
pub const IMPROVE_QUOTA_ERROR: &str = "目前API額度已達上限，無法生成改良版。";

pub const CONNECTION_ERROR: &str = "連線發生錯誤，系統已為您建立純文字卡片。";
pub const FEEDBACK_FAILED_PREFIX: &str = "取得回饋失敗:";
pub const IMPROVE_FAILED_PREFIX: &str = "生成改良卡片失敗:";

pub const TTS_FAILED: &str = "播放失敗。請檢查您的裝置是否開啟靜音模式。";
pub const TTS_NETWORK_ERROR: &str = "AI 語音讀取失敗，請檢查網路連線。";

/// Preset feedback on cards produced by the improvement flow.
pub const AI_FEEDBACK_INTRO: &str = "這是根據 AI 建議生成的改良版。";

/// Translation placeholder on fallback cards created while the remote is down.
pub const NO_TRANSLATION_FALLBACK: &str = "( 暫無翻譯 - API 連線限制 )";

pub const DEFAULT_TAG_NAME: &str = "預設分類";
