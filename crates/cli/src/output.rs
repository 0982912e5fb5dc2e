//! Terminal rendering.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use chrono::{DateTime, Local, Utc};

use furni_core::{OrderStatus, Price, Product};
use furni_storefront::orders::simulator;
use furni_storefront::{CartEntry, FavoriteEntry, Order};

pub fn failure(message: &str) {
    eprintln!("error: {message}");
}

pub fn success(message: &str) {
    println!("{message}");
}

pub fn products(products: &[&Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        let was = product
            .original_price
            .map(|p| format!(" (was {p})"))
            .unwrap_or_default();
        let discount = product
            .effective_discount()
            .map(|d| format!(" {d}% OFF"))
            .unwrap_or_default();
        let rating = product.rating.map(|r| format!(" {r:.1}/5")).unwrap_or_default();
        println!(
            "{:>4}  {:<28} {:<10} {:>10}{was}{discount}{rating}",
            product.id.as_i32(), product.name, product.category, product.price.to_string()
        );
    }
}

pub fn categories(names: &[&str]) {
    for name in names {
        println!("{name}");
    }
}

pub fn cart(entries: &[CartEntry], total: Price, item_count: u32) {
    if entries.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for entry in entries {
        let line_total = entry
            .line_total()
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:>4}  {:<28} {:>10} x {:<3} {:>12}",
            entry.product_id.as_i32(),
            entry.name,
            entry.unit_price.to_string(),
            entry.quantity,
            line_total
        );
    }
    println!("{item_count} item(s), total {total}");
}

pub fn favorites(entries: &[FavoriteEntry]) {
    if entries.is_empty() {
        println!("No favorites yet.");
        return;
    }
    for entry in entries {
        let stock = match (entry.in_stock, entry.stock_count) {
            (false, _) => "out of stock".to_string(),
            (true, Some(n)) if n <= 5 => format!("only {n} left"),
            (true, _) => "in stock".to_string(),
        };
        println!(
            "{:>4}  {:<28} {:>10}  {stock}",
            entry.product_id.as_i32(),
            entry.name,
            entry.price.to_string()
        );
    }
}

pub fn orders(orders: &[Order], now: DateTime<Utc>) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        order_summary(order, now);
    }
}

pub fn order_summary(order: &Order, now: DateTime<Utc>) {
    println!(
        "#{:<3} {}  {:<10} {:>12}  placed {}",
        order.id.as_i32(),
        order.order_number,
        order.status.as_str(),
        order.total_amount.to_string(),
        local(order.order_date)
    );
    for line in &order.line_items {
        println!("       {} x {}", line.quantity, line.name);
    }
    match order.status {
        OrderStatus::Processing => {
            if let Some(left) = simulator::time_remaining_to_cancel(order, now) {
                let secs = left.num_seconds().max(0);
                println!("       can be cancelled for {}m {:02}s", secs / 60, secs % 60);
            }
        }
        OrderStatus::Shipped => {
            if let Some(tracking) = &order.tracking_number {
                println!("       tracking {tracking}");
            }
            if let Some(eta) = order.estimated_delivery {
                println!("       estimated delivery {}", local(eta));
            }
        }
        OrderStatus::Delivered | OrderStatus::Cancelled => {}
    }
}

fn local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
}
