//! 解析コーディネーター
//!
//! 状態マシン（Idle → Analyzing → ResolvedWithMatches / ResolvedEmpty / Failed / Skipped）と
//! 同時実行ガードを持つ。状態と識別結果はここでしか書き換えない。
//!
//! ## 処理フロー
//! 1. ガード取得（取得できなければ何もしない）
//! 2. 前回の結果・エラー・選択・下書きタイトルを消去して Analyzing を公開
//! 3. 国コードがなければリモートを呼ばずフォールバック（位置情報の案内付き）
//! 4. リモート呼び出し → 候補あり / 候補なし / 失敗
//! 5. 同じ試行がまだ Analyzing のときだけ結果を反映（スキップ後の遅延結果は破棄）
//! 6. 反映前に中断・パニックで抜けた試行は汎用タイトルの Failed で確定

use super::fallback::LocalFallbackEngine;
use crate::error::{IdentifyError, Result};
use crate::photo::PhotoRef;
use crate::remote::{IdentifyRequest, Locale, RemoteIdentifier};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use wishlist_identify_common::{
    aggregate_fallback, aggregate_remote, seed_for_selection, Aggregated, AnalysisState,
    EditableDraft, FallbackOutcome, IdentificationResult, GENERIC_TITLE,
};

/// 試行が結果を反映せずに終わったときの理由
const INTERRUPTED_REASON: &str = "解析が中断されました";

/// 利用者への案内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Notice {
    /// 国コード未設定のためリモート識別を行っていない
    LocationRequired,
}

/// 表示層に渡す状態のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub state: AnalysisState,
    pub result: Option<IdentificationResult>,
    /// 選択中の候補
    pub selection: Option<usize>,
    pub draft: EditableDraft,
    /// バナー表示用（ブロックはしない）
    pub error: Option<String>,
    pub error_retryable: bool,
    pub notice: Option<Notice>,
    /// 手入力モード（スキップ・該当なし）
    pub manual_entry: bool,
    /// 試行番号（1始まり）
    pub attempt: u64,
}

impl AnalysisSnapshot {
    /// 新しい試行の開始時のリセット
    fn begin_attempt(&mut self, locale: &Locale) {
        self.state = AnalysisState::Analyzing;
        self.result = None;
        self.selection = None;
        self.error = None;
        self.error_retryable = false;
        self.notice = None;
        self.manual_entry = false;
        self.draft.clear_prefill();
        if self.draft.currency.is_empty() {
            self.draft.currency = locale.currency_code.clone();
        }
        self.attempt += 1;
    }
}

/// 1回の試行の結末
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 結果を反映した
    Completed(AnalysisState),
    /// 別の試行が進行中のため何もしなかった
    AlreadyRunning,
    /// 現在の状態からは開始できない
    NotAllowed(AnalysisState),
    /// 反映前に利用者が先へ進んだため結果を捨てた
    Discarded,
}

enum Resolution {
    Matches(Aggregated),
    Empty {
        aggregated: Aggregated,
        notice: Option<Notice>,
    },
    Failed {
        aggregated: Aggregated,
        reason: String,
        retryable: bool,
    },
}

impl Resolution {
    fn apply(self, snapshot: &mut AnalysisSnapshot) {
        match self {
            Resolution::Matches(Aggregated { result, seed }) => {
                snapshot.state = AnalysisState::ResolvedWithMatches;
                snapshot.selection = Some(0);
                snapshot.draft.seed(seed.title, seed.image_url);
                snapshot.result = Some(result);
            }
            Resolution::Empty { aggregated, notice } => {
                snapshot.state = AnalysisState::ResolvedEmpty;
                snapshot.notice = notice;
                snapshot.draft.seed(aggregated.seed.title, aggregated.seed.image_url);
                snapshot.result = Some(aggregated.result);
            }
            Resolution::Failed {
                aggregated,
                reason,
                retryable,
            } => {
                snapshot.state = AnalysisState::Failed { reason: reason.clone() };
                snapshot.error = Some(reason);
                snapshot.error_retryable = retryable;
                snapshot.draft.seed(aggregated.seed.title, aggregated.seed.image_url);
                snapshot.result = Some(aggregated.result);
            }
        }
    }
}

/// 進行中フラグのRAIIガード（どの経路で抜けても解放する）
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 結果を反映しないまま試行が終わった（呼び出し側の中断・パニック）ときに
/// 汎用タイトルの Failed で確定させる
struct SettleGuard<'a> {
    snapshot: &'a watch::Sender<AnalysisSnapshot>,
    attempt: u64,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        let attempt = self.attempt;
        let settled = self.snapshot.send_if_modified(|snap| {
            if snap.attempt != attempt || !snap.state.is_analyzing() {
                return false;
            }
            Resolution::Failed {
                aggregated: aggregate_fallback(FallbackOutcome::generic(), None),
                reason: INTERRUPTED_REASON.to_string(),
                retryable: true,
            }
            .apply(snap);
            true
        });

        if settled {
            tracing::warn!(attempt, "解析が途中で終了したため汎用タイトルで確定");
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Trigger {
    Start,
    Retry,
}

struct Shared {
    remote: Arc<dyn RemoteIdentifier>,
    fallback: LocalFallbackEngine,
    in_flight: AtomicBool,
    last_request: Mutex<Option<(PhotoRef, Locale)>>,
    snapshot: watch::Sender<AnalysisSnapshot>,
}

/// 解析コーディネーター
///
/// 複製しても同じ状態を共有する。
#[derive(Clone)]
pub struct AnalysisCoordinator {
    shared: Arc<Shared>,
}

impl AnalysisCoordinator {
    pub fn new(remote: Arc<dyn RemoteIdentifier>) -> Self {
        Self::with_fallback(remote, LocalFallbackEngine::default())
    }

    pub fn with_fallback(remote: Arc<dyn RemoteIdentifier>, fallback: LocalFallbackEngine) -> Self {
        let (snapshot, _) = watch::channel(AnalysisSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                remote,
                fallback,
                in_flight: AtomicBool::new(false),
                last_request: Mutex::new(None),
                snapshot,
            }),
        }
    }

    /// 現在のスナップショット
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn state(&self) -> AnalysisState {
        self.shared.snapshot.borrow().state.clone()
    }

    /// 状態変化の購読
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// 進行中の試行があるか（スキップ後も呼び出しが戻るまでは true）
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// 初回の解析（Idle のときだけ有効）
    pub async fn start(&self, photo: PhotoRef, locale: Locale) -> AttemptOutcome {
        self.run_attempt(Trigger::Start, Some((photo, locale))).await
    }

    /// 前回と同じ写真で再解析
    pub async fn retry(&self) -> AttemptOutcome {
        self.run_attempt(Trigger::Retry, None).await
    }

    /// 解析中に手入力へ切り替える（進行中の呼び出しは取り消さない）
    pub fn skip(&self) -> bool {
        let skipped = self.shared.snapshot.send_if_modified(|snap| {
            if !snap.state.is_analyzing() {
                return false;
            }
            snap.state = AnalysisState::Skipped;
            snap.selection = None;
            snap.manual_entry = true;
            snap.draft.seed(GENERIC_TITLE, None);
            true
        });

        if skipped {
            tracing::info!("解析をスキップして手入力へ");
        }
        skipped
    }

    /// 候補を選択して下書きに反映
    pub fn select_match(&self, index: usize) -> Result<()> {
        let selected = self.shared.snapshot.send_if_modified(|snap| {
            if snap.state != AnalysisState::ResolvedWithMatches {
                return false;
            }
            let seed = match snap.result.as_ref().and_then(|r| seed_for_selection(r, index)) {
                Some(seed) => seed,
                None => return false,
            };
            snap.selection = Some(index);
            snap.manual_entry = false;
            snap.draft.seed(seed.title, seed.image_url);
            true
        });

        if selected {
            tracing::debug!(index, "候補を選択");
            Ok(())
        } else {
            Err(IdentifyError::InvalidSelection(index))
        }
    }

    /// どの候補も違う → 手入力
    pub fn none_of_these(&self) -> bool {
        self.shared.snapshot.send_if_modified(|snap| {
            if snap.state != AnalysisState::ResolvedWithMatches {
                return false;
            }
            snap.selection = None;
            snap.manual_entry = true;
            snap.draft.seed(GENERIC_TITLE, None);
            true
        })
    }

    /// 下書きの編集（試行が終わった状態でのみ）
    pub fn edit_draft<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut EditableDraft),
    {
        self.shared.snapshot.send_if_modified(|snap| {
            if !snap.state.is_settled() {
                return false;
            }
            edit(&mut snap.draft);
            true
        })
    }

    async fn run_attempt(
        &self,
        trigger: Trigger,
        request: Option<(PhotoRef, Locale)>,
    ) -> AttemptOutcome {
        let Some(_flight) = FlightGuard::acquire(&self.shared.in_flight) else {
            tracing::debug!(?trigger, "解析が進行中のため無視");
            return AttemptOutcome::AlreadyRunning;
        };

        let (photo, locale) = match request.or_else(|| self.last_request()) {
            Some(request) => request,
            None => return AttemptOutcome::NotAllowed(self.state()),
        };

        let mut rejected = None;
        let mut attempt = 0;
        self.shared.snapshot.send_if_modified(|snap| {
            let allowed = match trigger {
                Trigger::Start => snap.state == AnalysisState::Idle,
                Trigger::Retry => snap.state.can_retry(),
            };
            if !allowed {
                rejected = Some(snap.state.clone());
                return false;
            }
            snap.begin_attempt(&locale);
            attempt = snap.attempt;
            true
        });

        if let Some(state) = rejected {
            tracing::debug!(?trigger, %state, "この状態からは解析を開始できない");
            return AttemptOutcome::NotAllowed(state);
        }

        // _flight より先に drop され、Analyzing のまま残さない
        let _settle = SettleGuard {
            snapshot: &self.shared.snapshot,
            attempt,
        };

        self.remember_request(&photo, &locale);
        tracing::info!(attempt, photo = %photo.file_name, ?trigger, "解析開始");

        let resolution = self.resolve(&photo, &locale).await;

        let mut final_state = None;
        let committed = self.shared.snapshot.send_if_modified(|snap| {
            if snap.attempt != attempt || !snap.state.is_analyzing() {
                return false;
            }
            resolution.apply(snap);
            final_state = Some(snap.state.clone());
            true
        });

        match final_state {
            Some(state) if committed => {
                tracing::info!(attempt, %state, "解析完了");
                AttemptOutcome::Completed(state)
            }
            _ => {
                tracing::info!(attempt, "利用者が先へ進んだため遅延結果を破棄");
                AttemptOutcome::Discarded
            }
        }
    }

    async fn resolve(&self, photo: &PhotoRef, locale: &Locale) -> Resolution {
        let request = match IdentifyRequest::new(photo, locale) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "国コード未設定のためリモート識別を省略");
                let outcome = self.shared.fallback.run_fallback(photo, None).await;
                return Resolution::Empty {
                    aggregated: aggregate_fallback(outcome, None),
                    notice: Some(Notice::LocationRequired),
                };
            }
        };

        match self.shared.remote.identify(&request).await {
            Ok(response) => match aggregate_remote(&response) {
                Some(aggregated) => {
                    tracing::debug!(matches = response.matches.len(), "リモート候補あり");
                    Resolution::Matches(aggregated)
                }
                None => {
                    tracing::info!("リモート候補0件、フォールバックへ");
                    let outcome = self
                        .shared
                        .fallback
                        .run_fallback(photo, response.detected_text())
                        .await;
                    Resolution::Empty {
                        aggregated: aggregate_fallback(outcome, Some(&response.query)),
                        notice: None,
                    }
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "リモート識別に失敗、フォールバックへ");
                let outcome = self
                    .shared
                    .fallback
                    .run_fallback(photo, e.partial_detected_text())
                    .await;
                Resolution::Failed {
                    aggregated: aggregate_fallback(outcome, None),
                    reason: e.to_string(),
                    retryable: e.is_recoverable_by_retry(),
                }
            }
        }
    }

    fn last_request(&self) -> Option<(PhotoRef, Locale)> {
        match self.shared.last_request.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn remember_request(&self, photo: &PhotoRef, locale: &Locale) {
        let mut guard = match self.shared.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some((photo.clone(), locale.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_guard_released_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let guard = FlightGuard::acquire(&flag);
            assert!(guard.is_some());
            assert!(FlightGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(FlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_settle_guard_resolves_abandoned_attempt() {
        let (tx, _rx) = watch::channel(AnalysisSnapshot {
            state: AnalysisState::Analyzing,
            attempt: 2,
            ..Default::default()
        });

        drop(SettleGuard { snapshot: &tx, attempt: 2 });

        let snap = tx.borrow().clone();
        assert_eq!(snap.state, AnalysisState::Failed { reason: INTERRUPTED_REASON.to_string() });
        assert_eq!(snap.draft.title, GENERIC_TITLE);
        assert!(snap.error_retryable);
        assert_eq!(snap.result.unwrap().confidence, 0.0);
    }

    #[test]
    fn test_settle_guard_leaves_other_attempts_alone() {
        let (tx, _rx) = watch::channel(AnalysisSnapshot {
            state: AnalysisState::Skipped,
            attempt: 2,
            ..Default::default()
        });
        drop(SettleGuard { snapshot: &tx, attempt: 2 });
        assert_eq!(tx.borrow().state, AnalysisState::Skipped);

        tx.send_modify(|snap| {
            snap.state = AnalysisState::Analyzing;
            snap.attempt = 3;
        });
        drop(SettleGuard { snapshot: &tx, attempt: 2 });
        assert_eq!(tx.borrow().state, AnalysisState::Analyzing);
    }

    #[test]
    fn test_begin_attempt_resets_everything() {
        let mut snap = AnalysisSnapshot {
            state: AnalysisState::Failed { reason: "boom".into() },
            result: Some(IdentificationResult::empty()),
            selection: Some(1),
            draft: EditableDraft {
                title: "Old title".into(),
                image_url: Some("https://img".into()),
                price: Some(10.0),
                currency: "EUR".into(),
                notes: "keep".into(),
            },
            error: Some("boom".into()),
            error_retryable: true,
            notice: Some(Notice::LocationRequired),
            manual_entry: true,
            attempt: 3,
        };
        let locale = Locale {
            country_code: Some("DE".into()),
            currency_code: "USD".into(),
            language_code: "de".into(),
        };

        snap.begin_attempt(&locale);

        assert_eq!(snap.state, AnalysisState::Analyzing);
        assert!(snap.result.is_none());
        assert!(snap.selection.is_none());
        assert!(snap.error.is_none());
        assert!(snap.notice.is_none());
        assert!(!snap.manual_entry);
        assert!(snap.draft.title.is_empty());
        assert!(snap.draft.image_url.is_none());
        assert_eq!(snap.draft.currency, "EUR");
        assert_eq!(snap.draft.notes, "keep");
        assert_eq!(snap.attempt, 4);
    }
}
