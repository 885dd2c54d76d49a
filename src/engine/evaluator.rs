//! Schedule evaluation and image application.
//!
//! One [`ScheduleEngine::evaluate_all`] call is one evaluation cycle: scan
//! every card, drop entries whose window has closed, and make each card's
//! image match its active entry. Cycles are idempotent, so running against
//! an already-correct store writes nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::cache::PageCache;
use crate::error::Result;
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::store::PortalStore;
use crate::store::types::{Card, CardPatch, ScheduleEntry, entries_to_blob, parse_entries};

/// Cache pattern invalidated after any card mutation.
const CARD_CACHE_PATTERN: &str = "/cards*";

/// How far past its window start an applied entry was first observed.
///
/// Both classes apply the image the same way; the split exists so missed
/// transitions (service downtime, long outage) are visible in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyWindow {
    /// Observed within one poll interval of the window opening.
    Within,
    /// Observed later than one poll interval after the window opened.
    Missed,
}

impl ApplyWindow {
    /// Classify a non-negative `elapsed_ms` since window start.
    pub fn classify(elapsed_ms: i64, poll_interval_ms: i64) -> Self {
        if elapsed_ms >= poll_interval_ms {
            Self::Missed
        } else {
            Self::Within
        }
    }
}

/// What one evaluation cycle did, for loop-side logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Cards fetched this cycle.
    pub cards_seen: usize,
    /// Expired entries removed across all cards.
    pub entries_pruned: usize,
    /// Images written because a window opened (or was caught up).
    pub images_applied: usize,
    /// Cards abandoned before evaluation completed (bad blob, write failure,
    /// card deleted mid-cycle).
    pub cards_skipped: usize,
}

impl CycleReport {
    /// True when the cycle changed nothing.
    pub fn is_quiet(&self) -> bool {
        self.entries_pruned == 0 && self.images_applied == 0 && self.cards_skipped == 0
    }
}

/// The schedule evaluation engine.
///
/// Holds the three collaborators every cycle talks to. Cheap to share;
/// construct once in the daemon and hand to the scheduler loop.
pub struct ScheduleEngine {
    store: Arc<dyn PortalStore>,
    cache: Arc<PageCache>,
    notifier: ChangeNotifier,
    poll_interval_ms: i64,
}

impl ScheduleEngine {
    /// `poll_interval_ms` must match the evaluation loop tick rate; it is
    /// also the boundary between a within-window and a missed application.
    pub fn new(
        store: Arc<dyn PortalStore>,
        cache: Arc<PageCache>,
        notifier: ChangeNotifier,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            // A zero interval would classify every application as missed.
            poll_interval_ms: (poll_interval_ms.max(1)) as i64,
        }
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms as u64
    }

    /// Run one evaluation cycle at `now`.
    ///
    /// Only the initial card fetch can fail; everything per-card is logged
    /// and contained so one bad card never blocks the rest.
    pub async fn evaluate_all(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let cards = self.store.cards().await?;
        let mut report = CycleReport {
            cards_seen: cards.len(),
            ..CycleReport::default()
        };

        for card in &cards {
            self.evaluate_card(card, now, &mut report).await;
        }

        if !report.is_quiet() {
            debug!(
                cards = report.cards_seen,
                pruned = report.entries_pruned,
                applied = report.images_applied,
                skipped = report.cards_skipped,
                "evaluation cycle changed state"
            );
        }
        Ok(report)
    }

    async fn evaluate_card(&self, card: &Card, now: DateTime<Utc>, report: &mut CycleReport) {
        let Some(blob) = card.schedule_entries.as_deref() else {
            return;
        };

        let entries = match parse_entries(blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(card_id = card.id, error = %e, "unparsable schedule blob, skipping card");
                report.cards_skipped += 1;
                return;
            }
        };

        let kept: Vec<ScheduleEntry> = entries
            .iter()
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
            .collect();
        let removed = entries.len() - kept.len();

        if removed > 0 {
            let patch = CardPatch::set_entries(entries_to_blob(&kept));
            match self.store.update_card(card.id, patch).await {
                Ok(Some(_)) => {
                    debug!(card_id = card.id, removed, "pruned expired schedule entries");
                    report.entries_pruned += removed;
                    self.cache.invalidate(CARD_CACHE_PATTERN);
                    self.notifier.emit(ChangeEvent::SchedulePruned {
                        card_id: card.id,
                        entries: kept.clone(),
                    });
                }
                Ok(None) => {
                    debug!(card_id = card.id, "card deleted mid-cycle, skipping");
                    report.cards_skipped += 1;
                    return;
                }
                Err(e) => {
                    error!(card_id = card.id, error = %e, "failed to persist pruned schedule");
                    report.cards_skipped += 1;
                    return;
                }
            }
        }

        // First active entry in stored order wins; overlaps are a
        // configuration problem the engine does not try to resolve.
        let Some(active) = kept.iter().find(|entry| entry.is_active_at(now)) else {
            return;
        };

        if card.image.as_deref() == Some(active.image.as_str()) {
            return;
        }

        let elapsed_ms = now.timestamp_millis() - active.start_date.timestamp_millis();
        match ApplyWindow::classify(elapsed_ms, self.poll_interval_ms) {
            ApplyWindow::Within => {
                debug!(card_id = card.id, elapsed_ms, "window opened, applying image");
            }
            ApplyWindow::Missed => {
                debug!(
                    card_id = card.id,
                    elapsed_ms, "window start was missed, applying image late"
                );
            }
        }

        match self
            .store
            .update_card(card.id, CardPatch::set_image(&active.image))
            .await
        {
            Ok(Some(_)) => {
                info!(card_id = card.id, image = %active.image, "applied scheduled image");
                report.images_applied += 1;
                self.cache.invalidate(CARD_CACHE_PATTERN);
                self.notifier.emit(ChangeEvent::ImageApplied {
                    card_id: card.id,
                    image: active.image.clone(),
                });
            }
            Ok(None) => {
                debug!(card_id = card.id, "card deleted mid-cycle, skipping");
                report.cards_skipped += 1;
            }
            Err(e) => {
                error!(card_id = card.id, error = %e, "failed to persist scheduled image");
            }
        }
    }
}
