//! The Router / Hub facade.
//!
//! This module provides the main entry point of the governance gate. The
//! [`Router`] owns every component and is the only place where data from one
//! agent can reach another.

use crate::{
    admission::AdmissionControl,
    config::{GateConfig, LogBackend},
    error::GateError,
    routing::{CommittedInput, Inboxes, COMMITTED_INPUT_SOURCE},
    Result,
};

use gate_decision::{
    restore, DecisionError, DecisionGate, ExpirySweeper, PendingApproval, RestoreReport,
    SweepReport, SweeperHandle,
};
use gate_log::{AppendOnlyLog, LogOptions, LogStore, MemoryStore, SledStore, VerifyReport};
use gate_scanner::{RiskScanner, RuleDef, RuleSet};
use gate_schema::{RegisteredSchema, Schema, SchemaRegistry};
use gate_types::canonical::digest_hex;
use gate_types::{
    AgentId, Capability, Clock, Decision, EventKind, EventRecord, HumanId, HumanVerdict, LogEntry,
    Participant, Proposal, ProposalId, SubmittedRecord, SystemClock,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// What `submit` hands back once the pipeline settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub proposal_id: ProposalId,
    /// Terminal decision, or PENDING_HUMAN.
    pub decision: Decision,
}

/// Where a proposal currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProposalStatus {
    InPipeline { stage: Option<EventKind> },
    Pending { deadline: DateTime<Utc> },
    Decided { decision: Decision },
    /// Frozen by an integrity failure; no outcome is guessed.
    Stalled { stage: Option<EventKind> },
}

/// Result of crash recovery in [`Router::open`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub backend: String,
    pub restored: RestoreReport,
    /// Overdue holds expired right after the restore.
    pub expired: Vec<ProposalId>,
}

/// The governance Router.
///
/// Every proposal flows through one pipeline:
///
/// 1. schema lookup (unregistered type fails before anything is logged)
/// 2. SUBMITTED
/// 3. validation → VALIDATED (a failure short-circuits to DECIDED)
/// 4. risk scan → SCANNED
/// 5. gate → GATED, then DECIDED or a human hold
///
/// Any log failure freezes the proposal and is returned as
/// [`GateError::Integrity`]; the router never guesses an outcome.
///
/// # Example
///
/// ```rust
/// use gate_core::{GateConfig, Router};
/// use gate_types::{AgentId, Decision};
/// use serde_json::json;
///
/// let router = Router::open(GateConfig::default()).unwrap();
/// let submission = router
///     .submit(&AgentId::new("writer"), "llm_output.v1", json!({"output": "Draft ready."}))
///     .unwrap();
/// assert_eq!(submission.decision, Decision::AutoApproved);
/// ```
#[derive(Debug)]
pub struct Router {
    config: GateConfig,
    log: Arc<AppendOnlyLog>,
    schemas: SchemaRegistry,
    scanner: RiskScanner,
    gate: Arc<DecisionGate>,
    admission: AdmissionControl,
    in_pipeline: RwLock<HashSet<ProposalId>>,
    /// Original payloads of proposals whose SUBMITTED snapshot was redacted.
    /// Process memory only: after a restart they cannot be re-published.
    unredacted: Mutex<HashMap<ProposalId, Value>>,
    inboxes: Inboxes,
    recovery: RecoveryReport,
}

impl Router {
    /// Opens the configured log, replays it and builds every component.
    ///
    /// # Errors
    ///
    /// - `Config` for invalid settings
    /// - `Log` if the log cannot be opened or fails verification
    /// - schema / rule set registration errors from the config
    pub fn open(config: GateConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`Router::open`] with an explicit time source.
    pub fn open_with_clock(config: GateConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn LogStore> = match &config.log.backend {
            LogBackend::Memory => Arc::new(MemoryStore::new()),
            LogBackend::Sled { path } => Arc::new(SledStore::open(path)?),
        };
        Self::open_with_store(config, store, clock)
    }

    /// Builds a router over an explicit store.
    pub fn open_with_store(
        config: GateConfig,
        store: Arc<dyn LogStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let backend = store.backend().to_string();
        let log = Arc::new(AppendOnlyLog::open(
            store,
            clock,
            LogOptions {
                redact_secrets: config.log.redact_secrets,
            },
        )?);

        let schemas = SchemaRegistry::with_builtins();
        for (name, schema) in &config.schemas {
            schemas.register(name.clone(), schema.clone())?;
        }

        let scanner = match config.rule_sets.split_first() {
            None => RiskScanner::with_builtin()?,
            Some((first, rest)) => {
                let scanner = RiskScanner::new(RuleSet::from_def(first.clone())?);
                for def in rest {
                    scanner.register(def.version.clone(), def.rules.clone())?;
                }
                scanner
            }
        };

        let (gate, restored) = restore(log.clone(), config.decision.clone());
        let gate = Arc::new(gate);
        let expired = if restored.overdue > 0 {
            gate.sweep().expired
        } else {
            Vec::new()
        };

        info!(
            "Router ready: {} log with {} entries, {} schemas, rule set {}",
            backend,
            log.len(),
            schemas.snapshot().names().len(),
            scanner.active().version()
        );
        if !restored.stalled.is_empty() {
            warn!(
                "{} proposals stalled before restart",
                restored.stalled.len()
            );
        }

        Ok(Self {
            admission: AdmissionControl::new(&config.admission),
            config,
            log,
            schemas,
            scanner,
            gate,
            in_pipeline: RwLock::new(HashSet::new()),
            unredacted: Mutex::new(HashMap::new()),
            inboxes: Inboxes::default(),
            recovery: RecoveryReport {
                backend,
                restored,
                expired,
            },
        })
    }

    /// Submits a payload and drives it until it is decided or held for a
    /// human.
    ///
    /// # Errors
    ///
    /// - `SchemaNotRegistered` before anything is logged
    /// - `Backpressure` / `Halted` from admission control
    /// - `Integrity` if a log write failed (the proposal is stalled)
    pub fn submit(
        &self,
        agent: &AgentId,
        proposal_type: &str,
        payload: Value,
    ) -> Result<Submission> {
        let snapshot = self.schemas.snapshot();
        let schema = snapshot
            .get(proposal_type)
            .ok_or_else(|| GateError::SchemaNotRegistered(proposal_type.to_string()))?;

        let _permit = self.admission.admit()?;
        let proposal = Proposal::new(agent.clone(), proposal_type, payload, self.log.clock().now());
        let proposal_id = proposal.id();

        self.in_pipeline
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(proposal_id);
        let result = self.run_pipeline(&proposal, &schema);
        self.in_pipeline
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&proposal_id);

        match &result {
            Ok(decision) => {
                self.admission.record_success();
                self.release_unless_approvable(proposal_id, *decision);
                info!(
                    "Proposal {} from {} ({}) -> {}",
                    proposal_id, agent, proposal_type, decision
                );
            }
            Err(e) => {
                self.release_unredacted(proposal_id);
                if e.is_integrity_failure() {
                    self.admission.record_integrity_failure();
                }
            }
        }

        result.map(|decision| Submission {
            proposal_id,
            decision,
        })
    }

    fn run_pipeline(
        &self,
        proposal: &Proposal,
        schema: &RegisteredSchema,
    ) -> Result<Decision> {
        let proposal_id = proposal.id();

        let submitted = self.append(
            proposal_id,
            EventRecord::Submitted(SubmittedRecord {
                agent: proposal.agent().clone(),
                proposal_type: proposal.proposal_type().to_string(),
                payload: proposal.payload().clone(),
                payload_digest: proposal.payload_digest(),
                redacted: false,
            }),
        )?;
        if matches!(&submitted.record, EventRecord::Submitted(s) if s.redacted) {
            self.unredacted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(proposal_id, proposal.payload().clone());
        }

        let validation = gate_schema::validate(proposal.payload(), schema);
        self.append(proposal_id, EventRecord::Validated(validation.clone()))?;
        if !validation.passed {
            debug!(
                "Proposal {} failed {} with {} violations; scanner skipped",
                proposal_id,
                schema.name,
                validation.violations.len()
            );
            return self
                .gate
                .reject_invalid(proposal_id, &validation)
                .map_err(|e| GateError::from_decision(proposal_id, e));
        }

        let scan = self.scanner.scan(proposal.payload());
        self.append(proposal_id, EventRecord::Scanned(scan.clone()))?;

        self.gate
            .gate(proposal_id, proposal.agent(), &scan)
            .map_err(|e| GateError::from_decision(proposal_id, e))
    }

    fn append(&self, proposal_id: ProposalId, record: EventRecord) -> Result<Arc<LogEntry>> {
        self.log.append(proposal_id, record).map_err(|source| {
            error!("Proposal {} stalled: {}", proposal_id, source);
            self.gate.mark_stalled(proposal_id);
            GateError::Integrity {
                proposal_id,
                source,
            }
        })
    }

    /// Latest durable decision. Never returns a value whose DECIDED (or
    /// GATED hold) entry is not yet in the log.
    pub fn get_decision(&self, proposal_id: ProposalId) -> Result<Decision> {
        if self.gate.is_stalled(proposal_id) {
            return Err(GateError::Stalled(proposal_id));
        }
        if let Some(decision) = self.gate.decision(proposal_id) {
            return Ok(decision);
        }
        if self.is_in_pipeline(proposal_id) {
            Err(GateError::InProgress(proposal_id))
        } else {
            Err(GateError::NotFound(proposal_id))
        }
    }

    fn is_in_pipeline(&self, proposal_id: ProposalId) -> bool {
        self.in_pipeline
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&proposal_id)
            || self.log.stage_of(proposal_id).is_some()
    }

    /// Where a proposal stands.
    pub fn status(&self, proposal_id: ProposalId) -> Result<ProposalStatus> {
        if self.gate.is_stalled(proposal_id) {
            return Ok(ProposalStatus::Stalled {
                stage: self.log.stage_of(proposal_id),
            });
        }
        if let Some(hold) = self.gate.pending_approval(proposal_id) {
            return Ok(ProposalStatus::Pending {
                deadline: hold.deadline,
            });
        }
        match self.gate.decision(proposal_id) {
            Some(decision) if decision.is_terminal() => Ok(ProposalStatus::Decided { decision }),
            _ if self.is_in_pipeline(proposal_id) => Ok(ProposalStatus::InPipeline {
                stage: self.log.stage_of(proposal_id),
            }),
            _ => Err(GateError::NotFound(proposal_id)),
        }
    }

    /// Applies a human verdict.
    pub fn resolve(
        &self,
        proposal_id: ProposalId,
        verdict: HumanVerdict,
        human: &HumanId,
    ) -> Result<Decision> {
        let result = self
            .gate
            .resolve(proposal_id, verdict, human)
            .map_err(|e| self.transition_error(proposal_id, e));
        if let Ok(decision) = result {
            self.release_unless_approvable(proposal_id, decision);
        }
        result
    }

    /// Withdraws a pending proposal on behalf of its submitter.
    pub fn cancel(&self, proposal_id: ProposalId, agent: &AgentId) -> Result<Decision> {
        let result = self
            .gate
            .cancel(proposal_id, agent)
            .map_err(|e| self.transition_error(proposal_id, e));
        if let Ok(decision) = result {
            self.release_unless_approvable(proposal_id, decision);
        }
        result
    }

    fn transition_error(
        &self,
        proposal_id: ProposalId,
        err: DecisionError,
    ) -> GateError {
        let err = GateError::from_decision(proposal_id, err);
        match &err {
            GateError::Integrity { .. } => {
                self.admission.record_integrity_failure();
                self.release_unredacted(proposal_id);
            }
            GateError::AlreadyResolved { decision, .. } => {
                self.release_unless_approvable(proposal_id, *decision);
            }
            _ => {}
        }
        err
    }

    /// Drops a held original payload once the proposal can no longer be
    /// approved.
    fn release_unless_approvable(&self, proposal_id: ProposalId, decision: Decision) {
        if decision.is_terminal() && !decision.is_approved() {
            self.release_unredacted(proposal_id);
        }
    }

    fn release_unredacted(&self, proposal_id: ProposalId) {
        self.unredacted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&proposal_id);
    }

    /// Expires every overdue hold now.
    pub fn sweep(&self) -> SweepReport {
        let report = self.gate.sweep();
        for _ in &report.stalled {
            self.admission.record_integrity_failure();
        }
        for proposal_id in report.expired.iter().chain(&report.stalled) {
            self.release_unredacted(*proposal_id);
        }
        report
    }

    /// Starts the background expiry sweeper on the current tokio runtime.
    pub fn start_sweeper(&self) -> SweeperHandle {
        ExpirySweeper::spawn(self.gate.clone(), self.config.sweep.interval())
    }

    /// Adds a schema; it is visible to submissions that start afterwards.
    pub fn register_schema(&self, name: impl Into<String>, schema: Schema) -> Result<u64> {
        Ok(self.schemas.register(name, schema)?)
    }

    /// Adds and activates a rule set for subsequent scans.
    pub fn register_rule_set(&self, version: impl Into<String>, rules: Vec<RuleDef>) -> Result<()> {
        self.scanner.register(version, rules)?;
        Ok(())
    }

    /// Entries with `from <= seq <= to`.
    pub fn read_log(&self, from: u64, to: u64) -> Vec<Arc<LogEntry>> {
        self.log.read(from, to)
    }

    /// Reloads the store and verifies the full chain.
    pub fn verify_log(&self) -> Result<VerifyReport> {
        Ok(self.log.verify_store()?)
    }

    /// Re-publishes an approved proposal to another agent.
    ///
    /// The delivered payload is the one that was validated, scanned and
    /// approved. When the log only holds a redacted snapshot of it, the
    /// original is taken from memory; if that is gone the call fails rather
    /// than deliver altered content.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `actor` holds `Administer`, or when `recipient`
    ///   is the submitter
    /// - `NotApproved` unless the proposal is AUTO_APPROVED or HUMAN_APPROVED
    /// - `PayloadRedacted` when only the redacted snapshot is left
    pub fn publish(
        &self,
        actor: &Participant,
        proposal_id: ProposalId,
        recipient: &AgentId,
    ) -> Result<CommittedInput> {
        require(actor, Capability::Administer)?;

        let decision = self.get_decision(proposal_id)?;
        if !decision.is_approved() {
            self.release_unless_approvable(proposal_id, decision);
            return Err(GateError::NotApproved {
                proposal_id,
                decision,
            });
        }

        let entries = self.log.entries_for(proposal_id);
        let submitted = entries
            .iter()
            .find_map(|e| match &e.record {
                EventRecord::Submitted(s) => Some(s),
                _ => None,
            })
            .ok_or(GateError::NotFound(proposal_id))?;
        if submitted.agent == *recipient {
            return Err(GateError::Forbidden(format!(
                "proposal {} cannot be re-published to its own submitter",
                proposal_id
            )));
        }
        let decided_seq = entries
            .iter()
            .find(|e| e.kind() == EventKind::Decided)
            .map(|e| e.seq)
            .ok_or(GateError::InProgress(proposal_id))?;

        let payload = if submitted.redacted {
            self.unredacted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&proposal_id)
                .filter(|original| digest_hex(original) == submitted.payload_digest)
                .cloned()
                .ok_or(GateError::PayloadRedacted(proposal_id))?
        } else {
            submitted.payload.clone()
        };

        let input = CommittedInput {
            source: COMMITTED_INPUT_SOURCE.to_string(),
            proposal_id,
            proposal_type: submitted.proposal_type.clone(),
            payload,
            payload_digest: submitted.payload_digest.clone(),
            decision,
            decided_seq,
            published_at: self.log.clock().now(),
        };
        self.inboxes.deliver(recipient.clone(), input.clone());
        info!("Published {} to {}", proposal_id, recipient);
        Ok(input)
    }

    /// Takes every committed input waiting for `agent`.
    pub fn drain_inbox(&self, agent: &AgentId) -> Vec<CommittedInput> {
        self.inboxes.drain(agent)
    }

    pub fn inbox_len(&self, agent: &AgentId) -> usize {
        self.inboxes.len(agent)
    }

    /// Holds waiting for a human, earliest deadline first.
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.gate.pending()
    }

    pub fn stalled(&self) -> Vec<ProposalId> {
        self.gate.stalled()
    }

    pub(crate) fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    pub fn is_halted(&self) -> bool {
        self.admission.is_halted()
    }

    /// Re-opens admissions after a halt.
    pub fn resume_admissions(&self) {
        self.admission.resume();
    }

    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn log_len(&self) -> u64 {
        self.log.len()
    }

    pub fn head_hash(&self) -> String {
        self.log.head_hash()
    }

    pub fn active_rule_set(&self) -> String {
        self.scanner.active().version().to_string()
    }

    pub fn schema_version(&self) -> u64 {
        self.schemas.version()
    }
}

fn require(participant: &Participant, capability: Capability) -> Result<()> {
    if participant.can(capability) {
        Ok(())
    } else {
        Err(GateError::Forbidden(format!(
            "{} lacks {:?}",
            participant, capability
        )))
    }
}
