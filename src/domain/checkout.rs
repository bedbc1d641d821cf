//! Checkout validation and price / address snapshotting.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{DeliveryAddress, NewOrder, OrderItem, PaymentMethod};
use super::payment::NewPayment;

/// Catalog entry as read at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub customer_id: Uuid,
    pub lines: Vec<CartLine>,
    pub address: DeliveryAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    pub delivery_fee: BigDecimal,
    /// Exact number of digits a subscriber number must have.
    pub phone_digits: usize,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: BigDecimal::from(20),
            phone_digits: 10,
        }
    }
}

fn required(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_phone(phone: &str, digits: usize) -> Result<(), DomainError> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() != digits || !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::InvalidInput(format!(
            "phone number must be exactly {digits} digits"
        )));
    }
    Ok(())
}

/// Rejects a checkout before any catalog lookup happens.
pub fn validate(input: &CheckoutInput, policy: &CheckoutPolicy) -> Result<(), DomainError> {
    if input.lines.is_empty() {
        return Err(DomainError::InvalidInput("cart is empty".to_string()));
    }
    if let Some(line) = input.lines.iter().find(|l| l.quantity < 1) {
        return Err(DomainError::InvalidInput(format!(
            "quantity for product {} must be at least 1",
            line.product_id
        )));
    }
    let address = &input.address;
    required(&address.apartment, "apartment")?;
    required(&address.block_no, "block number")?;
    required(&address.flat_no, "flat number")?;
    required(&address.phone, "phone")?;
    validate_phone(&address.phone, policy.phone_digits)
}

/// Merges repeated product lines, keeping first-seen order.
pub fn merge_lines(lines: &[CartLine]) -> Result<Vec<CartLine>, DomainError> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    DomainError::InvalidInput(format!(
                        "quantity for product {} is too large",
                        line.product_id
                    ))
                })?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Snapshots name and price of every line from `products`.
pub fn snapshot_items(
    lines: &[CartLine],
    products: &[Product],
) -> Result<Vec<OrderItem>, DomainError> {
    merge_lines(lines)?
        .into_iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| {
                    DomainError::InvalidInput(format!("product {} does not exist", line.product_id))
                })?;
            if !product.active {
                return Err(DomainError::InvalidInput(format!(
                    "{} is not available",
                    product.name
                )));
            }
            if product.stock < line.quantity {
                return Err(DomainError::InvalidInput(format!(
                    "only {} of {} left in stock",
                    product.stock, product.name
                )));
            }
            Ok(OrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price.clone(),
            })
        })
        .collect()
}

pub fn build_order(
    id: Uuid,
    input: &CheckoutInput,
    items: Vec<OrderItem>,
    policy: &CheckoutPolicy,
    payment: Option<NewPayment>,
) -> NewOrder {
    let subtotal = items
        .iter()
        .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
    NewOrder {
        id,
        customer_id: input.customer_id,
        payment_method: input.payment_method,
        address: input.address.clone(),
        total_amount: subtotal + &policy.delivery_fee,
        delivery_fee: policy.delivery_fee.clone(),
        items,
        payment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(phone: &str) -> DeliveryAddress {
        DeliveryAddress {
            recipient_name: None,
            phone: phone.to_string(),
            apartment: "Lake View".to_string(),
            block_no: "B".to_string(),
            flat_no: "402".to_string(),
            note: Some("ring twice".to_string()),
        }
    }

    fn product(price: i32, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Milk".to_string(),
            price: BigDecimal::from(price),
            stock,
            active: true,
        }
    }

    fn input(lines: Vec<CartLine>, phone: &str) -> CheckoutInput {
        CheckoutInput {
            customer_id: Uuid::new_v4(),
            lines,
            address: address(phone),
            payment_method: PaymentMethod::Cod,
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = validate(&input(vec![], "9876543210"), &CheckoutPolicy::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(m) if m.contains("cart is empty")));
    }

    #[test]
    fn phone_must_have_exact_digit_count() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        };
        let policy = CheckoutPolicy::default();
        assert!(validate(&input(vec![line], "98765 43210"), &policy).is_ok());
        assert!(validate(&input(vec![line], "98765"), &policy).is_err());
        assert!(validate(&input(vec![line], "98765abcde"), &policy).is_err());

        let eleven = CheckoutPolicy {
            phone_digits: 11,
            ..Default::default()
        };
        assert!(validate(&input(vec![line], "09876543210"), &eleven).is_ok());
    }

    #[test]
    fn missing_address_field_is_rejected() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        };
        let mut i = input(vec![line], "9876543210");
        i.address.flat_no = "  ".to_string();
        assert!(validate(&i, &CheckoutPolicy::default()).is_err());
    }

    #[test]
    fn duplicate_lines_are_merged() {
        let p = Uuid::new_v4();
        let merged = merge_lines(&[
            CartLine {
                product_id: p,
                quantity: 1,
            },
            CartLine {
                product_id: p,
                quantity: 2,
            },
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 3);
    }

    #[test]
    fn merged_quantity_overflow_is_rejected() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            quantity: i32::MAX,
        };
        assert!(matches!(
            merge_lines(&[line, line]),
            Err(DomainError::InvalidInput(_))
        ));
        let milk = product(100, i32::MAX);
        let huge = CartLine {
            product_id: milk.id,
            quantity: i32::MAX,
        };
        assert!(matches!(
            snapshot_items(&[huge, huge], &[milk]),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn order_total_adds_delivery_fee_to_snapshot_prices() {
        let milk = product(100, 5);
        let lines = vec![CartLine {
            product_id: milk.id,
            quantity: 2,
        }];
        let items = snapshot_items(&lines, &[milk.clone()]).unwrap();
        let order = build_order(
            Uuid::new_v4(),
            &input(lines, "9876543210"),
            items,
            &CheckoutPolicy::default(),
            None,
        );
        assert_eq!(order.total_amount, BigDecimal::from(220));
        assert_eq!(order.items[0].unit_price, BigDecimal::from(100));
        assert_eq!(order.items[0].product_name, "Milk");
    }

    #[test]
    fn unavailable_products_are_rejected() {
        let mut milk = product(100, 1);
        let lines = vec![CartLine {
            product_id: milk.id,
            quantity: 2,
        }];
        assert!(snapshot_items(&lines, &[milk.clone()]).is_err());

        milk.stock = 10;
        milk.active = false;
        assert!(snapshot_items(&lines, &[milk]).is_err());
        assert!(snapshot_items(&lines, &[]).is_err());
    }
}
