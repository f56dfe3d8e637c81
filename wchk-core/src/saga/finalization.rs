//! FinalizationSaga: the top-level "finalize order" operation.

use super::error::{SagaError, SagaStep};
use super::finalizer::{CheckoutFinalizer, CompleteCheckout};
use super::guard::InFlightRegistry;
use super::payment::{AuthorizePayment, PaymentAuthorizer};
use super::transfer::{ConfirmTransfer, OnChainTransferExecutor, SubmitTransfer};
use crate::backend::CheckoutBackend;
use crate::config::SettingsStore;
use crate::events::{SagaProgressReceiver, SagaProgressSender};
use crate::wallet::{WalletHandle, WalletProvider};
use kanau::processor::Processor;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;
use wchk_sdk::objects::{
    CheckoutSnapshot, CheckoutToken, FinalizeOutcome, OrderId, SagaProgress, SagaStage,
    TransferReceipt,
};

#[derive(Debug, Clone)]
/// Finalize the order for one checkout.
pub struct FinalizeOrder {
    /// Read-only for the duration of the run.
    pub checkout: CheckoutSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaSuccess {
    pub order_id: OrderId,
    pub receipt: TransferReceipt,
}

impl SagaSuccess {
    pub fn into_outcome(self) -> FinalizeOutcome {
        FinalizeOutcome::Success {
            order_id: self.order_id,
            transaction_hash: self.receipt.transaction_hash,
        }
    }
}

/// Runs payment authorization, transfer and completion in strict sequence.
///
/// At most one run per checkout token is in flight at a time; a second
/// concurrent request fails fast with [`SagaError::AlreadyInProgress`]
/// instead of registering a duplicate intent or transfer.
pub struct FinalizationSaga {
    authorizer: PaymentAuthorizer,
    executor: OnChainTransferExecutor,
    finalizer: CheckoutFinalizer,
    wallet: WalletHandle,
    settings: SettingsStore,
    in_flight: InFlightRegistry,
    progress_tx: SagaProgressSender,
}

impl FinalizationSaga {
    pub fn new(
        backend: Arc<dyn CheckoutBackend>,
        provider: Arc<dyn WalletProvider>,
        wallet: WalletHandle,
        settings: SettingsStore,
        progress_tx: SagaProgressSender,
    ) -> Self {
        Self {
            authorizer: PaymentAuthorizer::new(Arc::clone(&backend)),
            executor: OnChainTransferExecutor::new(provider),
            finalizer: CheckoutFinalizer::new(backend),
            wallet,
            settings,
            in_flight: InFlightRegistry::default(),
            progress_tx,
        }
    }

    pub fn subscribe_progress(&self) -> SagaProgressReceiver {
        self.progress_tx.subscribe()
    }

    pub fn is_in_flight(&self, token: &CheckoutToken) -> bool {
        self.in_flight.is_in_flight(token)
    }

    fn emit(&self, run_id: Uuid, token: &CheckoutToken, stage: SagaStage) {
        // Nobody listening is fine.
        let _ = self.progress_tx.send(SagaProgress {
            run_id,
            checkout_token: token.clone(),
            stage,
            timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
        });
    }

    async fn run_steps(
        &self,
        run_id: Uuid,
        checkout: &CheckoutSnapshot,
    ) -> Result<SagaSuccess, SagaError> {
        // One settings snapshot for the whole run, even across a reload.
        let settings = self.settings.current();
        let token = &checkout.token;
        let amount = checkout.total_price.amount;

        // -- Step 1: payment intent -------------------------------------------
        let intent = within(
            SagaStep::PaymentAuthorization,
            settings.timeouts.payment,
            self.authorizer.process(AuthorizePayment {
                checkout_token: token.clone(),
                amount,
                gateway: settings.gateway.clone(),
            }),
        )
        .await?
        .unwrap_or_else(|never| match never {});
        if !intent.accepted {
            return Err(SagaError::PaymentAuthorizationFailed {
                errors: intent.errors,
            });
        }
        self.emit(run_id, token, SagaStage::PaymentAuthorized);

        // -- Step 2: on-chain transfer ----------------------------------------
        // The step timeout bounds signing and broadcast only; the
        // confirmation wait has its own limit.
        let session = self.wallet.snapshot();
        let submitted = within(
            SagaStep::TransferSubmission,
            settings.timeouts.transfer,
            self.executor.process(SubmitTransfer {
                session,
                amount,
                transfer: settings.transfer.clone(),
            }),
        )
        .await
        .inspect_err(|_| warn!("Payment intent left registered after transfer timeout"))?
        .map_err(|e| {
            warn!(error = %e, "Payment intent left registered after failed transfer");
            SagaError::TransferSubmissionFailed(e)
        })?;
        let receipt = submitted.receipt();
        self.emit(
            run_id,
            token,
            SagaStage::TransferSubmitted {
                transaction_hash: submitted.hash.to_string(),
            },
        );

        self.executor
            .process(ConfirmTransfer {
                hash: submitted.hash,
                transfer: settings.transfer.clone(),
            })
            .await
            .map_err(|e| {
                warn!(tx_hash = %submitted.hash, error = %e, "Submitted transfer was not confirmed");
                SagaError::TransferSubmissionFailed(e)
            })?;

        // -- Step 3: completion -----------------------------------------------
        let reference = within(
            SagaStep::CheckoutCompletion,
            settings.timeouts.completion,
            self.finalizer.process(CompleteCheckout {
                checkout_token: token.clone(),
            }),
        )
        .await?
        .map_err(SagaError::from)?;
        let order_id = reference
            .order_id
            .ok_or(SagaError::OrderNotCreated { errors: Vec::new() })?;

        Ok(SagaSuccess { order_id, receipt })
    }
}

async fn within<T, E>(
    step: SagaStep,
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<Result<T, E>, SagaError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SagaError::TimedOut { step })
}

impl Processor<FinalizeOrder> for FinalizationSaga {
    type Output = SagaSuccess;
    type Error = SagaError;

    async fn process(&self, input: FinalizeOrder) -> Result<SagaSuccess, SagaError> {
        let token = input.checkout.token.clone();
        let Some(_guard) = self.in_flight.try_acquire(&token) else {
            warn!(checkout_token = %token, "Finalization already in progress");
            return Err(SagaError::AlreadyInProgress(token));
        };

        let run_id = Uuid::now_v7();
        let span = info_span!("FinalizationSaga", %run_id, checkout_token = %token);
        async {
            info!(
                amount = %input.checkout.total_price.amount,
                currency = %input.checkout.total_price.currency,
                "Finalization started"
            );
            self.emit(run_id, &token, SagaStage::Started);

            let result = self.run_steps(run_id, &input.checkout).await;
            match &result {
                Ok(success) => {
                    info!(order_id = %success.order_id, "Finalization succeeded");
                    self.emit(
                        run_id,
                        &token,
                        SagaStage::Completed {
                            order_id: success.order_id.clone(),
                        },
                    );
                }
                Err(e) => {
                    error!(error = %e, reason = ?e.kind(), "Finalization failed");
                    self.emit(run_id, &token, SagaStage::Failed { failure: e.to_failure() });
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompletionResponse;
    use crate::config::{CheckoutSettings, SagaTimeouts};
    use crate::events::saga_progress_channel;
    use crate::testing::{
        ALICE, FakeBackend, FakeWalletProvider, H1, REQUIRED_CHAIN, SendBehavior, checkout,
        test_settings,
    };
    use crate::wallet::WalletSessionManager;
    use wchk_sdk::objects::{ChainId, FailureKind, FieldError};

    struct Harness {
        backend: Arc<FakeBackend>,
        provider: Arc<FakeWalletProvider>,
        saga: Arc<FinalizationSaga>,
        _shutdown_tx: tokio::sync::watch::Sender<bool>,
    }

    async fn start_with(chain_id: ChainId, timeouts: SagaTimeouts) -> Harness {
        let mut settings = test_settings();
        settings.timeouts = timeouts;
        start_configured(chain_id, settings).await
    }

    async fn start_configured(chain_id: ChainId, settings: CheckoutSettings) -> Harness {
        let backend = FakeBackend::new();
        let provider = FakeWalletProvider::new(vec![ALICE], chain_id);
        let settings = SettingsStore::new(settings);

        let (manager, wallet) = WalletSessionManager::new(provider.clone(), REQUIRED_CHAIN);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(manager.run(shutdown_rx, settings.subscribe()));
        wallet.connect().await.unwrap();

        let (progress_tx, _) = saga_progress_channel();
        let saga = FinalizationSaga::new(
            backend.clone(),
            provider.clone(),
            wallet,
            settings,
            progress_tx,
        );
        Harness {
            backend,
            provider,
            saga: Arc::new(saga),
            _shutdown_tx: shutdown_tx,
        }
    }

    async fn start() -> Harness {
        start_with(REQUIRED_CHAIN, SagaTimeouts::default()).await
    }

    fn order(token: &str, amount: &str) -> FinalizeOrder {
        FinalizeOrder {
            checkout: checkout(token, amount),
        }
    }

    #[tokio::test]
    async fn test_happy_path_reports_order() {
        let h = start().await;
        let mut progress = h.saga.subscribe_progress();

        let success = h.saga.process(order("T1", "100.00")).await.unwrap();
        assert_eq!(success.order_id, OrderId("O1".into()));
        assert_eq!(success.receipt.transaction_hash, Some(H1.to_string()));
        assert_eq!(
            h.backend.calls(),
            vec!["create_payment_intent", "complete_checkout"]
        );
        assert_eq!(h.provider.sent().len(), 1);

        let intents = h.backend.intents();
        assert_eq!(intents[0].checkout_token, CheckoutToken::new("T1"));
        assert_eq!(intents[0].gateway, "G");

        let mut stages = Vec::new();
        while let Ok(event) = progress.try_recv() {
            stages.push(event.stage);
        }
        assert_eq!(
            stages,
            vec![
                SagaStage::Started,
                SagaStage::PaymentAuthorized,
                SagaStage::TransferSubmitted {
                    transaction_hash: H1.to_string()
                },
                SagaStage::Completed {
                    order_id: OrderId("O1".into())
                },
            ]
        );

        let outcome = success.into_outcome();
        assert!(matches!(outcome, FinalizeOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_payment_errors_stop_before_transfer() {
        let h = start().await;
        h.backend.update(|s| {
            s.intent_reply = Some(vec![FieldError {
                field: Some("postalCode".into()),
                message: Some("Invalid postal code".into()),
            }])
        });

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert!(matches!(err, SagaError::PaymentAuthorizationFailed { ref errors } if errors.len() == 1));
        assert!(h.provider.sent().is_empty());
        assert_eq!(h.backend.calls(), vec!["create_payment_intent"]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_payment() {
        let h = start().await;
        h.backend.update(|s| s.intent_reply = None);

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::PaymentAuthorizationFailed);
        assert_eq!(err.cause(), Some(FailureKind::Transport));
        assert!(h.provider.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_signature_skips_completion() {
        let h = start().await;
        h.provider.update(|s| s.send = SendBehavior::Reject);

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        let failure = err.to_failure();
        assert_eq!(failure.reason, FailureKind::TransferSubmissionFailed);
        assert_eq!(failure.cause, Some(FailureKind::UserRejected));
        // The intent stays registered; completion is never attempted.
        assert_eq!(h.backend.calls(), vec!["create_payment_intent"]);
    }

    #[tokio::test]
    async fn test_wrong_network_blocks_transfer() {
        let h = start_with(ChainId(1), SagaTimeouts::default()).await;

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert_eq!(err.cause(), Some(FailureKind::WrongNetwork));
        assert!(h.provider.sent().is_empty());
        assert_eq!(h.backend.calls(), vec!["create_payment_intent"]);
    }

    #[tokio::test]
    async fn test_missing_order_is_reported_distinctly() {
        let h = start().await;
        h.backend
            .update(|s| s.completion_reply = Some(CompletionResponse::default()));

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert!(matches!(err, SagaError::OrderNotCreated { ref errors } if errors.is_empty()));
        assert_eq!(err.to_failure().reason, FailureKind::OrderNotCreated);

        h.backend.update(|s| s.completion_reply = None);
        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::CheckoutCompletionFailed);
        assert_eq!(err.cause(), Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_concurrent_run_for_same_token_is_refused() {
        let h = start().await;
        h.backend
            .update(|s| s.intent_delay = Some(Duration::from_millis(200)));

        let saga = Arc::clone(&h.saga);
        let first = tokio::spawn(async move { saga.process(order("T1", "100.00")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.saga.is_in_flight(&CheckoutToken::new("T1")));

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert!(matches!(err, SagaError::AlreadyInProgress(_)));

        first.await.unwrap().unwrap();
        assert!(!h.saga.is_in_flight(&CheckoutToken::new("T1")));
        assert_eq!(h.backend.intents().len(), 1);
    }

    #[tokio::test]
    async fn test_step_timeout_is_not_a_rejection() {
        let timeouts = SagaTimeouts {
            payment: Duration::from_millis(20),
            ..SagaTimeouts::default()
        };
        let h = start_with(REQUIRED_CHAIN, timeouts).await;
        h.backend
            .update(|s| s.intent_delay = Some(Duration::from_millis(500)));

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::TimedOut {
                step: SagaStep::PaymentAuthorization
            }
        ));
        assert_eq!(err.cause(), Some(FailureKind::TimedOut));
        assert!(h.provider.sent().is_empty());
        assert!(!h.saga.is_in_flight(&CheckoutToken::new("T1")));
    }

    #[tokio::test]
    async fn test_completion_errors_without_order_keep_the_errors() {
        let h = start().await;
        h.backend.update(|s| {
            s.completion_reply = Some(CompletionResponse {
                order_id: None,
                errors: vec![FieldError {
                    field: None,
                    message: Some("Checkout not fully paid".into()),
                }],
            })
        });

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        let failure = err.to_failure();
        assert_eq!(failure.reason, FailureKind::OrderNotCreated);
        assert_eq!(failure.cause, None);
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(
            failure.errors[0].message.as_deref(),
            Some("Checkout not fully paid")
        );
    }

    #[tokio::test]
    async fn test_order_with_completion_errors_still_succeeds() {
        let h = start().await;
        h.backend.update(|s| {
            s.completion_reply = Some(CompletionResponse {
                order_id: Some(OrderId("O7".into())),
                errors: vec![FieldError {
                    field: Some("email".into()),
                    message: Some("Marketing opt-in failed".into()),
                }],
            })
        });

        let success = h.saga.process(order("T1", "100.00")).await.unwrap();
        assert_eq!(success.order_id, OrderId("O7".into()));
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_still_reports_its_hash() {
        let mut settings = test_settings();
        settings.transfer.required_confirmations = 2;
        settings.transfer.confirmation_poll_interval = Duration::from_millis(5);
        settings.transfer.confirmation_timeout = Duration::from_millis(50);
        settings.timeouts.transfer = Duration::from_millis(20);
        let h = start_configured(REQUIRED_CHAIN, settings).await;
        h.provider.update(|s| s.confirmations = None);
        let mut progress = h.saga.subscribe_progress();

        let err = h.saga.process(order("T1", "100.00")).await.unwrap_err();
        let failure = err.to_failure();
        assert_eq!(failure.reason, FailureKind::TransferSubmissionFailed);
        assert_eq!(failure.cause, Some(FailureKind::TransferNotConfirmed));
        assert!(failure.message.contains(&H1.to_string()));
        assert_eq!(h.backend.calls(), vec!["create_payment_intent"]);

        let mut stages = Vec::new();
        while let Ok(event) = progress.try_recv() {
            stages.push(event.stage);
        }
        assert_eq!(
            stages[2],
            SagaStage::TransferSubmitted {
                transaction_hash: H1.to_string()
            }
        );
        assert!(matches!(stages[3], SagaStage::Failed { .. }));
    }
}
