//! `furni orders` - order history and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use furni_storefront::session::UserStore;
use furni_storefront::{FileStore, OrderBook, OrderPoller, StoreSession};

use super::CliError;
use crate::OrdersAction;
use crate::output;

pub async fn run(
    session: &StoreSession<FileStore>,
    action: OrdersAction,
    default_period: Duration,
) -> Result<(), CliError> {
    let orders = session.orders()?;
    match action {
        OrdersAction::List => {
            let now = Utc::now();
            output::orders(&orders.list(now).await?, now);
        }
        OrdersAction::Cancel { id } => {
            let order = orders.cancel(id, Utc::now()).await?;
            output::success(&format!("Order {} has been cancelled.", order.order_number));
        }
        OrdersAction::Reorder { id } => {
            let units = session.reorder(id).await?;
            output::success(&format!("Added {units} item(s) to your cart."));
        }
        OrdersAction::Watch { period } => {
            let period = period.map_or(default_period, Duration::from_secs);
            watch(Arc::clone(orders), period).await?;
        }
    }
    Ok(())
}

/// Print the order list whenever a poll pass changes it, until Ctrl-C.
async fn watch(orders: Arc<OrderBook<UserStore<FileStore>>>, period: Duration) -> Result<(), CliError> {
    let now = Utc::now();
    output::orders(&orders.list(now).await?, now);

    let poller = OrderPoller::spawn(Arc::clone(&orders), period);
    let mut reports = poller.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(err) = report.last_error {
                    output::failure(&err);
                } else if report.changed > 0 {
                    let now = Utc::now();
                    output::success(&format!("-- {} order(s) updated --", report.changed));
                    output::orders(&orders.list(now).await?, now);
                }
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}
