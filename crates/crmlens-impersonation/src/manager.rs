//! The impersonation state machine.
//!
//! Owns the authoritative `tab → session` map and keeps it a lossless
//! projection of this service's rules in the engine, except during the
//! window of an in-flight start or stop. The map is process-local; the
//! rule table is what survives a background restart.
//!
//! Failure policy: a rule that fails to *remove* is logged and tolerated —
//! in-memory and badge cleanup proceed so the visible state never sticks.
//! A rule that fails to *add* is fatal to the start, because the override
//! would silently not apply.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crmlens_protocols::error::ImpersonationError;
use crmlens_protocols::{BadgeIndicator, ImpersonatedUser, RuleEngine};

use crate::config::ImpersonationConfig;
use crate::rule_codec::{build_rule, parse_rule};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

/// One active override: this tab's outgoing API calls carry this user.
#[derive(Debug, Clone)]
pub struct TabImpersonation {
    pub tab_id: i64,
    pub user: ImpersonatedUser,
    /// Id of the durable rule projecting this session into the engine.
    pub rule_id: i64,
    pub hostname: String,
    pub created_at: DateTime<Utc>,
}

/// Long-lived state machine owning every per-tab override.
///
/// Constructed once by the process entry point and handed by reference to
/// request handlers; there is no ambient global.
pub struct ImpersonationManager {
    config: ImpersonationConfig,
    rules: Arc<dyn RuleEngine>,
    badge: Arc<dyn BadgeIndicator>,
    sessions: DashMap<i64, TabImpersonation>,
    /// Serializes start/stop per tab: the replace-in-place window spans
    /// engine awaits, and two interleaved starts for one tab would each
    /// persist a rule.
    tab_gates: DashMap<i64, Arc<Mutex<()>>>,
    next_rule_id: AtomicI64,
}

impl ImpersonationManager {
    pub fn new(
        config: ImpersonationConfig,
        rules: Arc<dyn RuleEngine>,
        badge: Arc<dyn BadgeIndicator>,
    ) -> Self {
        let first = config.first_rule_id;
        Self {
            config,
            rules,
            badge,
            sessions: DashMap::new(),
            tab_gates: DashMap::new(),
            next_rule_id: AtomicI64::new(first),
        }
    }

    fn tab_gate(&self, tab_id: i64) -> Arc<Mutex<()>> {
        self.tab_gates.entry(tab_id).or_default().clone()
    }

    /// Begin impersonating `user` in `tab_id`.
    ///
    /// Replaces any existing override for the tab (implicit stop-then-start).
    /// The target must be an https URL with a hostname; browser-internal
    /// pages cannot carry an override.
    pub async fn start_impersonation(
        &self,
        tab_id: i64,
        tab_url: &str,
        user: ImpersonatedUser,
    ) -> Result<(), ImpersonationError> {
        if user.object_id.trim().is_empty() {
            return Err(ImpersonationError::MissingObjectId);
        }
        let hostname = secure_hostname(tab_url)
            .ok_or_else(|| ImpersonationError::InvalidTarget(tab_url.to_string()))?;

        let gate = self.tab_gate(tab_id);
        let _serialized = gate.lock().await;

        // Implicit stop: take the old session out and drop its rule before
        // the new rule lands, so the tab never carries two overrides.
        if let Some((_, old)) = self.sessions.remove(&tab_id) {
            debug!(tab_id, old_rule = old.rule_id, "replacing active impersonation");
            self.remove_rule_tolerant(old.rule_id).await;
        }

        // Ids are never reused within a process lifetime, even after
        // deletion: a recycled id could collide with a rule the engine has
        // not finished evicting.
        let rule_id = self.next_rule_id.fetch_add(1, Ordering::SeqCst);
        let rule = build_rule(rule_id, tab_id, &hostname, &user.object_id, &self.config);
        self.rules.add_rule(rule).await?;

        if let Err(e) = self.badge.set_text(tab_id, &user.initials()).await {
            warn!(tab_id, error = %e, "badge update failed, continuing");
        }

        info!(tab_id, rule_id, user = %user.display_name, %hostname, "impersonation started");
        self.sessions.insert(
            tab_id,
            TabImpersonation {
                tab_id,
                user,
                rule_id,
                hostname,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// End the override for `tab_id`. No-op when none is active.
    pub async fn stop_impersonation(&self, tab_id: i64) {
        let gate = self.tab_gate(tab_id);
        let _serialized = gate.lock().await;

        let Some((_, session)) = self.sessions.remove(&tab_id) else {
            debug!(tab_id, "stop requested with no active impersonation");
            return;
        };

        self.remove_rule_tolerant(session.rule_id).await;
        if let Err(e) = self.badge.clear(tab_id).await {
            warn!(tab_id, error = %e, "badge clear failed, continuing");
        }
        info!(tab_id, rule_id = session.rule_id, "impersonation stopped");
    }

    /// Who `tab_id` is currently running as, if anyone. Pure lookup.
    pub fn status(&self, tab_id: i64) -> Option<ImpersonatedUser> {
        self.sessions.get(&tab_id).map(|s| s.user.clone())
    }

    /// Full session record, for diagnostics.
    pub fn session(&self, tab_id: i64) -> Option<TabImpersonation> {
        self.sessions.get(&tab_id).map(|s| s.clone())
    }

    /// Number of active overrides.
    pub fn active_len(&self) -> usize {
        self.sessions.len()
    }

    /// The rule id the next start will receive.
    pub fn next_rule_id(&self) -> i64 {
        self.next_rule_id.load(Ordering::SeqCst)
    }

    /// Tab destroyed: its override dies with it, rules must not orphan.
    pub async fn handle_tab_closed(&self, tab_id: i64) {
        self.stop_impersonation(tab_id).await;
    }

    /// Destructive full reset for install/browser-start: remove every rule
    /// this service owns in the engine (memory is empty after a restart, so
    /// the engine is swept, not the map), clear the map, reset the id
    /// counter. Idempotent.
    pub async fn initialize_on_startup(&self) -> Result<(), ImpersonationError> {
        for entry in self.sessions.iter() {
            if let Err(e) = self.badge.clear(entry.tab_id).await {
                warn!(tab_id = entry.tab_id, error = %e, "badge clear failed during reset");
            }
        }
        self.sessions.clear();

        let existing = self.rules.list_rules().await?;
        if !existing.is_empty() {
            let ids: Vec<i64> = existing.iter().map(|r| r.id).collect();
            info!(count = ids.len(), "removing persisted impersonation rules");
            self.rules.remove_rules(&ids).await?;
        }

        self.next_rule_id
            .store(self.config.first_rule_id, Ordering::SeqCst);
        Ok(())
    }

    /// Best-effort inverse of rule creation, for a mid-session service
    /// restart: rebuild the map from persisted rules (display names are
    /// gone, a sentinel stands in) and move the id counter past every
    /// surviving rule. Malformed rules are skipped and logged, never fatal.
    ///
    /// Returns the number of sessions rebuilt.
    pub async fn reconstruct_from_existing_rules(&self) -> Result<usize, ImpersonationError> {
        let existing = self.rules.list_rules().await?;
        let mut rebuilt = 0usize;
        let mut high_water = self.config.first_rule_id - 1;

        for rule in &existing {
            high_water = high_water.max(rule.id);
            let Some(parsed) = parse_rule(rule, &self.config) else {
                warn!(rule_id = rule.id, "skipping unparseable rule during reconstruction");
                continue;
            };
            self.sessions.insert(
                parsed.tab_id,
                TabImpersonation {
                    tab_id: parsed.tab_id,
                    user: ImpersonatedUser::reconstructed(parsed.object_id),
                    rule_id: parsed.rule_id,
                    hostname: parsed.hostname,
                    created_at: Utc::now(),
                },
            );
            rebuilt += 1;
        }

        self.next_rule_id.store(high_water + 1, Ordering::SeqCst);
        info!(
            rebuilt,
            total = existing.len(),
            next_rule_id = high_water + 1,
            "reconstructed impersonation state from persisted rules"
        );
        Ok(rebuilt)
    }

    /// Operator escape hatch; identical to [`initialize_on_startup`].
    ///
    /// [`initialize_on_startup`]: Self::initialize_on_startup
    pub async fn force_cleanup(&self) -> Result<(), ImpersonationError> {
        self.initialize_on_startup().await
    }

    async fn remove_rule_tolerant(&self, rule_id: i64) {
        // The engine may have evicted the rule already; visible-state
        // cleanup wins over perfect rule-table state.
        if let Err(e) = self.rules.remove_rules(&[rule_id]).await {
            warn!(rule_id, error = %e, "rule removal failed, continuing");
        }
    }
}

/// Hostname of `tab_url` when it is a secure absolute web URL.
fn secure_hostname(tab_url: &str) -> Option<String> {
    let url = Url::parse(tab_url).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    url.host_str().map(str::to_string)
}
