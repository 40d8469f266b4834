//! CLI表示アダプター
//!
//! コーディネーターのスナップショットを表示し、利用者の操作
//! （候補選択・該当なし・再試行・スキップ・下書き編集）を送り返す。

use crate::analyzer::{AnalysisCoordinator, AnalysisSnapshot, AttemptOutcome, Notice};
use crate::error::{IdentifyError, Result};
use crate::photo::PhotoRef;
use crate::remote::Locale;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use wishlist_identify_common::{AnalysisState, EditableDraft};

/// 対話メニューの項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Select(usize),
    NoneOfThese,
    EditDraft,
    Retry,
    Done,
}

/// 開始する試行の種類
pub enum AttemptKind {
    Start(PhotoRef, Locale),
    Retry,
}

/// スナップショットを人が読める形にする
pub fn describe(snapshot: &AnalysisSnapshot) -> String {
    let mut lines = vec![format!("状態: {}", snapshot.state)];

    if !snapshot.draft.title.is_empty() {
        lines.push(format!("商品名: {}", snapshot.draft.title));
    }
    if let Some(image) = &snapshot.draft.image_url {
        lines.push(format!("画像: {}", image));
    }

    if let Some(result) = &snapshot.result {
        lines.push(format!("信頼度: {:.0}%", result.confidence * 100.0));
        if let Some(category) = &result.best_guess_category {
            lines.push(format!("カテゴリ: {}", category));
        }
        if result.is_fallback() {
            lines.push("候補: なし（写真から推定）".to_string());
        } else {
            lines.push("候補:".to_string());
            for (i, product) in result.suggested_products.iter().enumerate() {
                let marker = if snapshot.selection == Some(i) { ">" } else { " " };
                lines.push(format!("  {} {}. {}", marker, i + 1, product.title));
            }
        }
    }

    if snapshot.notice == Some(Notice::LocationRequired) {
        lines.push(
            "⚠ 国コードが未設定のため写真からの推定のみ行いました（`config --set-country`）"
                .to_string(),
        );
    }
    if let Some(error) = &snapshot.error {
        let hint = if snapshot.error_retryable { "（再試行できます）" } else { "" };
        lines.push(format!("⚠ {}{}", error, hint));
    }

    lines.join("\n")
}

/// 現在の状態で選べる操作
pub fn menu_items(snapshot: &AnalysisSnapshot) -> Vec<(MenuItem, String)> {
    let mut items = Vec::new();

    if snapshot.state == AnalysisState::ResolvedWithMatches {
        if let Some(result) = &snapshot.result {
            for (i, product) in result.suggested_products.iter().enumerate() {
                let label = format!("候補{}を選ぶ: {}", i + 1, product.title);
                items.push((MenuItem::Select(i), label));
            }
        }
        items.push((MenuItem::NoneOfThese, "どれも違う（手入力）".to_string()));
    }

    if snapshot.state.is_settled() {
        items.push((MenuItem::EditDraft, "商品名・価格・メモを編集".to_string()));
    }

    // 位置情報未設定は利用者が設定するまで再試行しても同じ
    if snapshot.state.can_retry() && snapshot.notice != Some(Notice::LocationRequired) {
        items.push((MenuItem::Retry, "再試行".to_string()));
    }

    items.push((MenuItem::Done, "完了".to_string()));
    items
}

pub fn prompt_action(snapshot: &AnalysisSnapshot) -> Result<MenuItem> {
    let items = menu_items(snapshot);
    let labels: Vec<&str> = items.iter().map(|(_, label)| label.as_str()).collect();

    let index = Select::new()
        .with_prompt("操作を選択")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| IdentifyError::Prompt(e.to_string()))?;

    Ok(items[index].0)
}

pub fn prompt_draft(draft: &EditableDraft) -> Result<EditableDraft> {
    let title: String = Input::new()
        .with_prompt("商品名")
        .with_initial_text(draft.title.clone())
        .interact_text()
        .map_err(|e| IdentifyError::Prompt(e.to_string()))?;

    let price_text: String = Input::new()
        .with_prompt(format!("価格 ({})", draft.currency))
        .with_initial_text(draft.price.map(|p| p.to_string()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .map_err(|e| IdentifyError::Prompt(e.to_string()))?;

    let notes: String = Input::new()
        .with_prompt("メモ")
        .with_initial_text(draft.notes.clone())
        .allow_empty(true)
        .interact_text()
        .map_err(|e| IdentifyError::Prompt(e.to_string()))?;

    Ok(EditableDraft {
        title: title.trim().to_string(),
        image_url: draft.image_url.clone(),
        price: parse_price(&price_text),
        currency: draft.currency.clone(),
        notes,
    })
}

/// 価格入力を解釈（空・不正・負数は未設定）
fn parse_price(input: &str) -> Option<f64> {
    input
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// スピナーを出しながら解析する
///
/// 試行の間は Ctrl+C を監視し続け、`skip_after` 経過後に押されたらスキップする。
/// それより前の Ctrl+C は無視する（監視を始めた時点で既定の SIGINT 終了は無効になる）。
/// スキップした場合は `None`。
pub async fn analyze_with_spinner(
    coordinator: &AnalysisCoordinator,
    kind: AttemptKind,
    skip_after: Duration,
) -> Result<Option<AttemptOutcome>> {
    let worker = coordinator.clone();
    let mut task = tokio::spawn(async move {
        match kind {
            AttemptKind::Start(photo, locale) => worker.start(photo, locale).await,
            AttemptKind::Retry => worker.retry().await,
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("解析中...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let skip_offer = tokio::time::sleep(skip_after);
    tokio::pin!(skip_offer);
    let mut skip_offered = false;

    let joined = loop {
        tokio::select! {
            joined = &mut task => break joined,
            _ = &mut skip_offer, if !skip_offered => {
                skip_offered = true;
                spinner.set_message("解析中... (Ctrl+Cでスキップして手入力)");
            }
            _ = tokio::signal::ctrl_c() => {
                if !skip_offered {
                    tracing::debug!("スキップ受付前の Ctrl+C を無視");
                } else if coordinator.skip() {
                    spinner.finish_and_clear();
                    return Ok(None);
                }
                // スキップ前に解析が終わっていた場合は次の周で task が完了する
            }
        }
    };

    spinner.finish_and_clear();
    joined
        .map(Some)
        .map_err(|e| IdentifyError::Prompt(format!("解析タスクが異常終了: {}", e)))
}
