//! Order lifecycle simulation.
//!
//! Orders progress without a backend, purely as a function of the time
//! elapsed since they were placed:
//!
//! - `processing -> shipped` once the cancellation window (10 minutes) has
//!   passed. A tracking number is assigned and delivery is estimated 24 hours
//!   after the transition.
//! - `shipped -> delivered` once the estimated delivery time is reached.
//! - `processing -> cancelled` only on request, and only inside the window.
//!
//! [`recompute`] is a pure function of `(order, now)` apart from the random
//! tracking number, so it can be driven by a periodic poller or called
//! lazily on read with the same outcome.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

use furni_core::OrderStatus;

use super::Order;
use crate::error::StorefrontError;

/// Minutes after placement during which a processing order may be cancelled.
pub const CANCELLATION_WINDOW_MINUTES: i64 = 10;

/// Hours between shipping and the estimated delivery.
pub const DELIVERY_WINDOW_HOURS: i64 = 24;

const TRACKING_PREFIX: &str = "TRK";
const TRACKING_SUFFIX_LEN: usize = 9;

/// Length of the cancellation window.
#[must_use]
pub fn cancellation_window() -> Duration {
    Duration::minutes(CANCELLATION_WINDOW_MINUTES)
}

/// Time from shipping to estimated delivery.
#[must_use]
pub fn delivery_window() -> Duration {
    Duration::hours(DELIVERY_WINDOW_HOURS)
}

/// Generate a tracking number such as `TRK4F7Q2ZK9A`.
#[must_use]
pub fn generate_tracking_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TRACKING_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{TRACKING_PREFIX}{suffix}")
}

/// Returns `true` if `order` may be cancelled at `now`.
#[must_use]
pub fn is_cancellable(order: &Order, now: DateTime<Utc>) -> bool {
    order.status == OrderStatus::Processing && now - order.order_date < cancellation_window()
}

/// Time left to cancel, or `None` once the order can no longer be cancelled.
#[must_use]
pub fn time_remaining_to_cancel(order: &Order, now: DateTime<Utc>) -> Option<Duration> {
    is_cancellable(order, now).then(|| cancellation_window() - (now - order.order_date))
}

/// Apply every transition due at `now` in a single pass.
///
/// Running it again with the same `now` changes nothing.
#[must_use]
pub fn recompute(order: &Order, now: DateTime<Utc>) -> Order {
    recompute_with(order, now, generate_tracking_number)
}

/// [`recompute`] with a caller-supplied tracking number source.
#[must_use]
pub fn recompute_with(
    order: &Order,
    now: DateTime<Utc>,
    tracking_number: impl FnOnce() -> String,
) -> Order {
    let mut next = order.clone();
    if next.status.is_terminal() {
        next.cancellable = false;
        return next;
    }

    if next.status == OrderStatus::Processing && now - next.order_date >= cancellation_window() {
        // When the order should already have arrived, date the shipment at the
        // end of the window so the delivery transition below applies now.
        let scheduled_delivery = next.order_date + cancellation_window() + delivery_window();
        let estimate = if now >= scheduled_delivery {
            scheduled_delivery
        } else {
            now + delivery_window()
        };

        advance(&mut next, OrderStatus::Shipped);
        next.estimated_delivery = Some(estimate);
        if next.tracking_number.is_none() {
            next.tracking_number = Some(tracking_number());
        }
    }

    if next.status == OrderStatus::Shipped {
        let estimate = *next
            .estimated_delivery
            .get_or_insert_with(|| now + delivery_window());
        if now >= estimate {
            advance(&mut next, OrderStatus::Delivered);
        }
    }

    next.cancellable = is_cancellable(&next, now);
    next
}

fn advance(order: &mut Order, next: OrderStatus) {
    debug_assert!(
        order.status.can_transition_to(next),
        "illegal transition {} -> {next}",
        order.status
    );
    order.status = next;
}

/// Cancel `order` at `now`.
///
/// # Errors
///
/// Returns `StorefrontError::PolicyViolation` if the order is not processing
/// or the cancellation window has closed.
pub fn cancel(order: &Order, now: DateTime<Utc>) -> Result<Order, StorefrontError> {
    if !order.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(StorefrontError::PolicyViolation(format!(
            "Order {} is {} and can no longer be cancelled.",
            order.order_number, order.status
        )));
    }
    if !is_cancellable(order, now) {
        return Err(StorefrontError::PolicyViolation(format!(
            "This order can only be cancelled within {CANCELLATION_WINDOW_MINUTES} minutes of placement."
        )));
    }

    let mut cancelled = order.clone();
    advance(&mut cancelled, OrderStatus::Cancelled);
    cancelled.cancellable = false;
    Ok(cancelled)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use furni_core::{OrderId, Price, ProductId};

    use super::*;
    use crate::orders::LineItem;

    fn order_placed(at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "ORD-2024-001".to_string(),
            line_items: vec![LineItem {
                product_id: ProductId::new(1),
                name: "Modern Luxury Sofa Set".to_string(),
                unit_price: Price::from_cents(89_900),
                image_ref: "sofa.jpg".to_string(),
                quantity: 1,
            }],
            total_amount: Price::from_cents(89_900),
            status: OrderStatus::Processing,
            order_date: at,
            estimated_delivery: None,
            cancellable: true,
            tracking_number: None,
        }
    }

    #[test]
    fn test_fresh_order_is_processing_and_cancellable() {
        let now = Utc::now();
        let order = recompute(&order_placed(now), now);
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.cancellable);
        assert!(order.tracking_number.is_none());
    }

    #[test]
    fn test_ships_after_window() {
        let now = Utc::now();
        let order = recompute(&order_placed(now - Duration::minutes(15)), now);

        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(!order.cancellable);
        assert_eq!(order.estimated_delivery, Some(now + Duration::hours(24)));
        let tracking = order.tracking_number.unwrap();
        assert!(tracking.starts_with("TRK"));
        assert_eq!(tracking.len(), 12);
    }

    #[test]
    fn test_ships_exactly_at_window_boundary() {
        let now = Utc::now();
        let order = recompute(&order_placed(now - Duration::minutes(10)), now);
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_long_gap_delivers_in_one_pass() {
        let now = Utc::now();
        let placed = now - Duration::hours(40);
        let order = recompute(&order_placed(placed), now);

        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.tracking_number.is_some());
        assert_eq!(
            order.estimated_delivery,
            Some(placed + Duration::minutes(10) + Duration::hours(24))
        );
    }

    #[test]
    fn test_shipped_delivers_at_estimate() {
        let start = Utc::now();
        let shipped = recompute(&order_placed(start - Duration::minutes(10)), start);
        let eta = shipped.estimated_delivery.unwrap();

        let before = recompute(&shipped, eta - Duration::seconds(1));
        assert_eq!(before.status, OrderStatus::Shipped);
        let at = recompute(&shipped, eta);
        assert_eq!(at.status, OrderStatus::Delivered);
        assert_eq!(at.tracking_number, shipped.tracking_number);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let now = Utc::now();
        for minutes_ago in [0, 5, 15, 60 * 30, 60 * 24 * 7] {
            let once = recompute(&order_placed(now - Duration::minutes(minutes_ago)), now);
            let twice = recompute_with(&once, now, || "TRKUNUSED0".to_string());
            assert_eq!(once, twice, "order placed {minutes_ago} minutes ago");
        }
    }

    #[test]
    fn test_cancel_inside_window() {
        let now = Utc::now();
        let order = order_placed(now - Duration::minutes(9));
        let cancelled = cancel(&order, now).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(!cancelled.cancellable);

        let later = recompute(&cancelled, now + Duration::days(3));
        assert_eq!(later.status, OrderStatus::Cancelled);
        assert!(later.tracking_number.is_none());
    }

    #[test]
    fn test_cancel_outside_window_is_policy_violation() {
        let now = Utc::now();
        let order = order_placed(now - Duration::minutes(11));
        assert!(matches!(
            cancel(&order, now),
            Err(StorefrontError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_cancel_shipped_is_policy_violation() {
        let now = Utc::now();
        let shipped = recompute(&order_placed(now - Duration::minutes(30)), now);
        let err = cancel(&shipped, now).unwrap_err();
        assert!(err.to_string().contains("shipped"));
    }

    #[test]
    fn test_terminal_orders_are_left_alone() {
        let now = Utc::now();
        let mut stale = order_placed(now - Duration::minutes(2));
        stale.status = OrderStatus::Delivered;

        // A terminal order keeps its status even when the clock says otherwise.
        let recomputed = recompute(&stale, now + Duration::days(2));
        assert_eq!(recomputed.status, OrderStatus::Delivered);
        assert!(!recomputed.cancellable);
        assert!(recomputed.tracking_number.is_none());

        let err = cancel(&stale, now).unwrap_err();
        assert!(err.to_string().contains("delivered"));
    }

    #[test]
    fn test_every_step_follows_the_lifecycle() {
        let placed = Utc::now();
        let mut order = order_placed(placed);
        for minutes in [0, 5, 10, 60, 60 * 24, 60 * 24 * 2] {
            let next = recompute(&order, placed + Duration::minutes(minutes));
            assert!(
                next.status == order.status || order.status.can_transition_to(next.status),
                "{} -> {}",
                order.status,
                next.status
            );
            order = next;
        }
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_estimate_is_fixed_by_first_shipping_pass() {
        let placed = Utc::now() - Duration::days(3);
        let at = |minutes: i64| placed + Duration::minutes(minutes);

        let polled = recompute(&order_placed(placed), at(11));
        let lazy = recompute(&order_placed(placed), at(20 * 60));
        assert_eq!(polled.estimated_delivery, Some(at(11 + 24 * 60)));
        assert_eq!(lazy.estimated_delivery, Some(at(44 * 60)));

        assert_eq!(recompute(&polled, at(30 * 60)).status, OrderStatus::Delivered);
        assert_eq!(recompute(&lazy, at(30 * 60)).status, OrderStatus::Shipped);

        // Both agree once the latest possible estimate has passed.
        assert_eq!(recompute(&polled, at(48 * 60 + 10)).status, OrderStatus::Delivered);
        assert_eq!(recompute(&lazy, at(48 * 60 + 10)).status, OrderStatus::Delivered);
    }

    #[test]
    fn test_time_remaining_to_cancel() {
        let now = Utc::now();
        let order = order_placed(now - Duration::minutes(4));
        assert_eq!(
            time_remaining_to_cancel(&order, now),
            Some(Duration::minutes(6))
        );
        let expired = order_placed(now - Duration::minutes(10));
        assert_eq!(time_remaining_to_cancel(&expired, now), None);
    }
}
