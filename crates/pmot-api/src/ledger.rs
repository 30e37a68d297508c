//! Premium entitlement driven by verified payments.
//!
//! `is_premium` only ever goes from false to true, and only after the gateway
//! signature checks out and the order is known to belong to the caller.

use tracing::{info, warn};

use pmot_db::Database;
use pmot_db::models::NewPayment;
use pmot_db::queries;
use pmot_payments::{GatewayError, Order};

use crate::middleware::Identity;
use crate::{ApiError, AppState, blocking};

const CAPTURED: &str = "captured";

/// The single premium price point.
#[derive(Debug, Clone)]
pub struct PremiumPlan {
    /// Minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("payment verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Gateway(e) => ApiError::Gateway(e.to_string()),
            LedgerError::VerificationFailed => ApiError::VerificationFailed,
            LedgerError::Storage(e) => ApiError::Internal(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Payment recorded and premium switched on by this call.
    Granted,
    /// This exact payment was already recorded for the caller.
    AlreadyGranted,
}

/// Open a gateway order for the premium plan and remember who it is for.
pub async fn create_order(state: &AppState, identity: &Identity) -> Result<Order, LedgerError> {
    let plan = state.premium.clone();
    let order = state
        .gateway
        .create_order(plan.amount, &plan.currency)
        .await
        .inspect_err(|e| warn!("Order creation for {} failed: {}", identity.username, e))?;

    let user_id = identity.id;
    let order_id = order.id.clone();
    blocking(state, move |s| {
        s.db.with_tx(|tx| {
            queries::insert_premium_order(tx, &order_id, user_id, plan.amount, &plan.currency)
        })
        .map_err(LedgerError::from)
    })
    .await?;

    info!("Premium order {} opened for {}", order.id, identity.username);
    Ok(order)
}

/// Check the gateway signature, then record the payment and grant premium.
pub async fn verify_and_grant(
    state: &AppState,
    identity: &Identity,
    payment_id: String,
    order_id: String,
    signature: String,
) -> Result<Grant, LedgerError> {
    if !state.gateway.verify_signature(&payment_id, &order_id, &signature) {
        warn!(
            "Rejected payment signature from {} (order {}, payment {})",
            identity.username, order_id, payment_id
        );
        return Err(LedgerError::VerificationFailed);
    }

    let user_id = identity.id;
    let grant = blocking(state, move |s| record_grant(&s.db, user_id, &payment_id, &order_id)).await?;

    if grant == Grant::Granted {
        info!("Premium granted to {}", identity.username);
    }
    Ok(grant)
}

/// Ledger half of [`verify_and_grant`]: one transaction that records the
/// payment and flips the flag together.
pub fn record_grant(db: &Database, user_id: i64, payment_id: &str, order_id: &str) -> Result<Grant, LedgerError> {
    db.with_tx(|tx| {
        let order = queries::premium_order(tx, order_id)?
            .filter(|order| order.user_id == user_id)
            .ok_or(LedgerError::VerificationFailed)?;

        if let Some(existing) = queries::payment_by_payment_id(tx, payment_id)? {
            return if existing.user_id == user_id && existing.order_id == order_id {
                Ok(Grant::AlreadyGranted)
            } else {
                Err(LedgerError::VerificationFailed)
            };
        }

        // One payment per order
        if queries::payment_by_order_id(tx, order_id)?.is_some() {
            return Err(LedgerError::VerificationFailed);
        }

        queries::insert_payment(
            tx,
            &NewPayment {
                user_id,
                payment_id,
                order_id: &order.order_id,
                amount: order.amount,
                currency: &order.currency,
                status: CAPTURED,
            },
        )?;
        queries::set_premium(tx, user_id)?;
        Ok(Grant::Granted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeGateway, identity, sign, state, state_with};

    fn is_premium(db: &Database, username: &str) -> bool {
        db.get_user_by_username(username).unwrap().unwrap().is_premium
    }

    fn payment_for_order(db: &Database, order_id: &str) -> Option<pmot_db::models::PaymentRow> {
        db.with_conn(|conn| queries::payment_by_order_id(conn, order_id)).unwrap()
    }

    #[tokio::test]
    async fn valid_signature_grants_premium_once() {
        let state = state();
        let alice = identity(&state.db, "alice");

        let order = create_order(&state, &alice).await.unwrap();
        assert_eq!(order.raw["amount"], 49900);

        let sig = sign(&order.id, "pay_1");
        let grant = verify_and_grant(&state, &alice, "pay_1".into(), order.id.clone(), sig.clone())
            .await
            .unwrap();
        assert_eq!(grant, Grant::Granted);
        assert!(is_premium(&state.db, "alice"));

        // Replaying the same confirmation does not add a second ledger row
        let grant = verify_and_grant(&state, &alice, "pay_1".into(), order.id.clone(), sig)
            .await
            .unwrap();
        assert_eq!(grant, Grant::AlreadyGranted);

        let payment = payment_for_order(&state.db, &order.id).unwrap();
        assert_eq!(payment.user_id, alice.id);
        assert_eq!(payment.amount, 49900);
        assert_eq!(payment.status, CAPTURED);
        let replayed = state
            .db
            .with_conn(|conn| queries::payment_by_payment_id(conn, "pay_1"))
            .unwrap()
            .unwrap();
        assert_eq!(replayed.id, payment.id);
    }

    #[tokio::test]
    async fn tampered_signature_changes_nothing() {
        let state = state();
        let alice = identity(&state.db, "alice");
        let order = create_order(&state, &alice).await.unwrap();

        let mut sig = sign(&order.id, "pay_1");
        sig.replace_range(0..2, if sig.starts_with("00") { "11" } else { "00" });

        let err = verify_and_grant(&state, &alice, "pay_1".into(), order.id.clone(), sig)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::VerificationFailed));
        assert!(!is_premium(&state.db, "alice"));
        assert!(payment_for_order(&state.db, &order.id).is_none());
    }

    #[tokio::test]
    async fn someone_elses_order_is_rejected() {
        let state = state();
        let alice = identity(&state.db, "alice");
        let bob = identity(&state.db, "bob");

        let order = create_order(&state, &alice).await.unwrap();
        let sig = sign(&order.id, "pay_1");

        let err = verify_and_grant(&state, &bob, "pay_1".into(), order.id, sig)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::VerificationFailed));
        assert!(!is_premium(&state.db, "bob"));
    }

    #[tokio::test]
    async fn unknown_order_is_rejected() {
        let state = state();
        let alice = identity(&state.db, "alice");
        let sig = sign("order_made_up", "pay_1");

        let err = verify_and_grant(&state, &alice, "pay_1".into(), "order_made_up".into(), sig)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::VerificationFailed));
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_as_gateway_error() {
        let state = state_with(FakeGateway::failing());
        let alice = identity(&state.db, "alice");

        let err = create_order(&state, &alice).await.unwrap_err();
        assert!(matches!(err, LedgerError::Gateway(_)));
        assert!(matches!(ApiError::from(err), ApiError::Gateway(_)));
    }

    #[test]
    fn second_payment_for_a_paid_order_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = identity(&db, "alice");
        db.with_tx(|tx| queries::insert_premium_order(tx, "order_1", alice.id, 49900, "INR"))
            .unwrap();

        assert_eq!(record_grant(&db, alice.id, "pay_1", "order_1").unwrap(), Grant::Granted);
        assert!(matches!(
            record_grant(&db, alice.id, "pay_2", "order_1"),
            Err(LedgerError::VerificationFailed)
        ));
    }
}
