//! The verify-and-submit workflow
//!
//! One call to [`Orchestrator::run`] is one press of "Verify". It walks
//! `Idle -> AwaitingProof -> Validating -> AwaitingWallet -> Submitting -> Done`,
//! dropping to `Aborted` from whichever step fails. Nothing is retried.

use alloy_primitives::Address;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{FlowError, Result};
use crate::submitter::AttestationSubmitter;
use crate::types::{AttestationRequest, AttestationResult, Session, TransactionHandle};
use crate::validator::ResultValidator;
use crate::wallet::WalletGateway;
use crate::widget::ProofWidget;

pub const SUCCESS_MESSAGE: &str = "Congratulations! You're Eligible!";

/// Where a verification attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingProof,
    Validating,
    AwaitingWallet,
    Submitting,
    Done,
    Aborted,
}

impl FlowState {
    /// Whether the workflow may move from `self` to `next`.
    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        match (self, next) {
            (Idle, AwaitingProof)
            | (AwaitingProof, Validating)
            | (Validating, AwaitingWallet)
            | (AwaitingWallet, Submitting)
            | (Submitting, Done) => true,
            (Idle, Aborted) | (Done, _) | (Aborted, _) => false,
            (_, Aborted) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Done | FlowState::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Alert,
    Success,
}

/// A blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Receives the notices a run raises for the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Prints notices to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Alert => {
                warn!("{}", notice.message);
                eprintln!("!! {}", notice.message);
            }
            NoticeLevel::Success => {
                info!("{}", notice.message);
                println!("{}", notice.message);
            }
        }
    }
}

/// What happened during one run.
#[derive(Debug)]
pub struct FlowReport {
    /// Every state visited, starting at `Idle`
    pub history: Vec<FlowState>,
    pub outcome: Result<TransactionHandle>,
}

impl FlowReport {
    /// Last state the run reached
    pub fn final_state(&self) -> FlowState {
        self.history.last().copied().unwrap_or(FlowState::Idle)
    }

    /// State the run was in when it aborted
    pub fn aborted_from(&self) -> Option<FlowState> {
        match self.history.as_slice() {
            [.., from, FlowState::Aborted] => Some(*from),
            _ => None,
        }
    }
}

struct Flow {
    history: Vec<FlowState>,
}

impl Flow {
    fn new() -> Self {
        Self {
            history: vec![FlowState::Idle],
        }
    }

    fn state(&self) -> FlowState {
        self.history.last().copied().unwrap_or(FlowState::Idle)
    }

    fn advance(&mut self, next: FlowState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(FlowError::Unexpected(format!(
                "illegal transition {:?} -> {:?}",
                current, next
            )));
        }
        info!("Verification flow: {:?} -> {:?}", current, next);
        self.history.push(next);
        Ok(())
    }

    fn abort(&mut self) {
        if let Err(e) = self.advance(FlowState::Aborted) {
            error!("Could not abort verification flow: {}", e);
        }
    }
}

/// Drives one verification attempt per [`run`](Orchestrator::run).
pub struct Orchestrator {
    widget: Arc<dyn ProofWidget>,
    validator: ResultValidator,
    gateway: WalletGateway,
    submitter: AttestationSubmitter,
    notifier: Arc<dyn Notifier>,
    recipient_hint: Option<Address>,
}

impl Orchestrator {
    /// Wire the workflow's collaborators together.
    pub fn new(
        widget: Arc<dyn ProofWidget>,
        validator: ResultValidator,
        gateway: WalletGateway,
        submitter: AttestationSubmitter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            widget,
            validator,
            gateway,
            submitter,
            notifier,
            recipient_hint: None,
        }
    }

    /// Recipient passed to the widget at launch, before the wallet is connected.
    /// Results not bound to the connected account are never submitted.
    pub fn with_recipient_hint(mut self, recipient: Option<Address>) -> Self {
        self.recipient_hint = recipient;
        self
    }

    /// Run one verification attempt. `session` is only written on success.
    pub async fn run(&self, request: &AttestationRequest, session: &mut Session) -> FlowReport {
        let mut flow = Flow::new();

        let outcome = self
            .drive(&mut flow, request)
            .await
            .and_then(|finished| flow.advance(FlowState::Done).map(|()| finished));

        let outcome = match outcome {
            Ok((result, handle)) => {
                session.record_success(result, &handle);
                self.notifier.notify(&Notice {
                    level: NoticeLevel::Success,
                    message: SUCCESS_MESSAGE.to_string(),
                });
                Ok(handle)
            }
            Err(err) => {
                error!("Verification aborted in {:?} ({}): {}", flow.state(), err.kind(), err);
                flow.abort();
                self.notifier.notify(&Notice {
                    level: NoticeLevel::Alert,
                    message: err.to_string(),
                });
                Err(err)
            }
        };

        debug_assert!(flow.state().is_terminal());
        FlowReport {
            history: flow.history,
            outcome,
        }
    }

    async fn drive(
        &self,
        flow: &mut Flow,
        request: &AttestationRequest,
    ) -> Result<(AttestationResult, TransactionHandle)> {
        flow.advance(FlowState::AwaitingProof)?;
        if !self.widget.is_available().await {
            return Err(FlowError::ProofWidgetUnavailable(
                "Please install zkPass TransGate".to_string(),
            ));
        }
        let result = self.widget.launch(request, self.recipient_hint).await?;

        flow.advance(FlowState::Validating)?;
        if !self.validator.validate(&result, &request.schema_id) {
            return Err(FlowError::InvalidResult(format!(
                "proof for task {} does not verify against schema {}",
                result.task_id, request.schema_id
            )));
        }
        // The submitted recipient must be covered by the validator signature.
        let bound = result
            .recipient
            .as_deref()
            .ok_or_else(|| FlowError::InvalidResult("result is not bound to a recipient".to_string()))
            .and_then(|r| {
                Address::from_str(r).map_err(|e| FlowError::InvalidResult(format!("recipient: {}", e)))
            })?;

        flow.advance(FlowState::AwaitingWallet)?;
        let signer = self.gateway.connect().await?;

        if bound != signer.address() {
            return Err(FlowError::InvalidResult(format!(
                "result is bound to {}, but the wallet account is {}",
                bound,
                signer.address()
            )));
        }

        flow.advance(FlowState::Submitting)?;
        let handle = self.submitter.submit(&result, &signer).await?;

        Ok((result, handle))
    }
}
