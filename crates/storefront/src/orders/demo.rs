//! Demo order history for a fresh install.

use chrono::{DateTime, Datelike, Duration, Utc};

use furni_core::{OrderId, OrderStatus, Price, ProductId};

use super::{LineItem, Order};

fn item(id: i32, name: &str, dollars: i64, image: &str, quantity: u32) -> LineItem {
    LineItem {
        product_id: ProductId::new(id),
        name: name.to_string(),
        unit_price: Price::from_cents(dollars * 100),
        image_ref: format!("https://images.unsplash.com/{image}?w=400&h=400&fit=crop"),
        quantity,
    }
}

fn order(
    seq: i32,
    now: DateTime<Utc>,
    line_items: Vec<LineItem>,
    status: OrderStatus,
    placed_ago: Duration,
) -> Order {
    let total_amount = line_items
        .iter()
        .filter_map(LineItem::line_total)
        .sum();
    Order {
        id: OrderId::new(seq),
        order_number: format!("ORD-{}-{seq:03}", now.year()),
        line_items,
        total_amount,
        status,
        order_date: now - placed_ago,
        estimated_delivery: None,
        cancellable: status == OrderStatus::Processing,
        tracking_number: None,
    }
}

/// Four orders, one in each lifecycle state, dated relative to `now`.
pub(super) fn demo_orders(now: DateTime<Utc>) -> Vec<Order> {
    let mut shipped = order(
        2,
        now,
        vec![
            item(3, "Luxury King Bed Frame", 1299, "photo-1505693416388-ac5ce068fe85", 1),
            item(5, "Scandinavian Coffee Table", 299, "photo-1506439773649-6e0eb8cfb237", 1),
        ],
        OrderStatus::Shipped,
        Duration::days(2),
    );
    shipped.estimated_delivery = Some(now + Duration::days(1));
    shipped.tracking_number = Some("TRK123456789".to_string());

    vec![
        order(
            1,
            now,
            vec![item(1, "Modern Luxury Sofa Set", 899, "photo-1586023492125-27b2c045efd7", 1)],
            OrderStatus::Processing,
            Duration::minutes(5),
        ),
        shipped,
        order(
            3,
            now,
            vec![item(4, "Executive Office Chair", 399, "photo-1541558869434-2840d308329a", 2)],
            OrderStatus::Delivered,
            Duration::days(7),
        ),
        order(
            4,
            now,
            vec![item(6, "Modern Bookshelf", 199, "photo-1507003211169-0a1dd7228f2d", 1)],
            OrderStatus::Cancelled,
            Duration::minutes(15),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_orders_cover_every_state() {
        let now = Utc::now();
        let orders = demo_orders(now);

        let states: Vec<_> = orders.iter().map(|o| o.status).collect();
        assert_eq!(states, OrderStatus::ALL.to_vec());
        assert_eq!(orders[1].total_amount, Price::from_cents(159_800));
        assert_eq!(orders[2].total_amount, Price::from_cents(79_800));
        assert!(orders[0].cancellable);
        assert!(orders.iter().skip(1).all(|o| !o.cancellable));
    }
}
