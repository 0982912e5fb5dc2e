//! `furni cart` - cart commands.

use chrono::Utc;

use furni_storefront::{FileStore, StoreSession};

use super::CliError;
use crate::CartAction;
use crate::output;

pub async fn run(session: &StoreSession<FileStore>, action: CartAction) -> Result<(), CliError> {
    let cart = session.cart()?;
    match action {
        CartAction::List => {
            let entries = cart.list_items().await?;
            output::cart(&entries, cart.total().await?, cart.item_count().await?);
        }
        CartAction::Add { id, quantity } => {
            let name = session.product(id)?.name.clone();
            let now_in_cart = session.add_to_cart(id, quantity).await?;
            output::success(&format!("Added {name} to cart ({now_in_cart} in cart)."));
        }
        CartAction::Remove { id } => {
            if cart.remove_item(id).await? {
                output::success("Removed from cart.");
            } else {
                output::success("That product is not in your cart.");
            }
        }
        CartAction::Set { id, quantity } => {
            cart.set_quantity(id, quantity).await?;
            output::success("Cart updated.");
        }
        CartAction::Clear => {
            cart.clear().await?;
            output::success("Cart cleared.");
        }
        CartAction::Checkout => {
            let order = session.checkout(Utc::now()).await?;
            output::success(&format!(
                "Order {} placed. Total {}. You can cancel it within 10 minutes.",
                order.order_number, order.total_amount
            ));
        }
    }
    Ok(())
}
