//! Checkout
//!
//! Pre-submission validation, the flattened sale payload and its hand-off to
//! a [`SaleGateway`]. A sale is submitted at most once per call and never
//! retried. The cart is only cleared once the backend has confirmed the sale.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::Cart,
    discounts,
    gateway::{GatewayError, SaleConfirmation, SaleGateway},
    payments::PaymentMethod,
    pricing::PricingError,
    products::{Catalog, Product, ProductKey},
};

/// Errors that stop a sale from being submitted.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to sell.
    #[error("cart is empty")]
    EmptyCart,

    /// A line refers to a product missing from the catalog.
    #[error("product {0:?} is not in the catalog")]
    UnknownProduct(ProductKey),

    /// More units requested than the catalog has in stock.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product identifier
        product: String,

        /// Units requested across all lines of the cart
        requested: u64,

        /// Units in stock
        available: u32,
    },

    /// The payment method needs a selected customer.
    #[error("payment method {0} requires a customer")]
    CustomerRequired(PaymentMethod),

    /// Totals could not be calculated.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The backend refused or could not be reached.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Check that a cart can be submitted against the given catalog.
///
/// Stock is checked against the quantity summed over every line of a product.
///
/// # Errors
///
/// Returns the first failing rule, checked in this order: empty cart, unknown
/// product, insufficient stock, customer required.
pub fn validate(cart: &Cart<'_>, catalog: &Catalog<'_>) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut requested: FxHashMap<ProductKey, (&Product<'_>, u64)> = FxHashMap::default();

    for item in cart.iter() {
        let product = catalog
            .get(item.product())
            .ok_or(CheckoutError::UnknownProduct(item.product()))?;

        requested.entry(item.product()).or_insert((product, 0)).1 += u64::from(item.quantity());
    }

    // Each product is checked once, at its first line
    for item in cart.iter() {
        let Some((product, total)) = requested.remove(&item.product()) else {
            continue;
        };

        if total > u64::from(product.stock) {
            return Err(CheckoutError::InsufficientStock {
                product: product.id.clone(),
                requested: total,
                available: product.stock,
            });
        }
    }

    if cart.payment_method().requires_customer() && cart.customer().is_none() {
        return Err(CheckoutError::CustomerRequired(cart.payment_method()));
    }

    Ok(())
}

/// A line of a sale, as sent to the backend. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLinePayload {
    /// Backend product identifier
    pub product_id: String,

    /// Units sold
    pub quantity: u32,

    /// Tax-inclusive unit price before the line discount
    pub base_unit_price: i64,

    /// Unit price after the line discount
    pub final_unit_price: i64,

    /// Line discount in percent points
    pub discount_rate: Decimal,

    /// Tax rate in percent points
    pub tax_rate: Decimal,

    /// Line total with tax backed out
    pub total_excl_tax: i64,

    /// Tax contained in the line total
    pub tax: i64,

    /// Line total, tax included
    pub total_incl_tax: i64,
}

/// Flattened sale, as sent to the backend. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    /// ISO currency code
    pub currency: &'static str,

    /// How the sale is settled
    pub payment_method: PaymentMethod,

    /// Selected customer, if any
    pub customer_id: Option<String>,

    /// Global discount in percent points
    pub global_discount: Decimal,

    /// Loyalty discount actually applied, in percent points
    pub loyalty_discount: Decimal,

    /// Sold lines, in cart order
    pub lines: Vec<SaleLinePayload>,

    /// Sum of line totals with tax backed out
    pub total_excl_tax: i64,

    /// Sum of tax backed out of each line
    pub total_tax: i64,

    /// Tax-inclusive subtotal before sale-wide discounts
    pub subtotal_incl_tax: i64,

    /// Amount taken off by the global discount
    pub global_discount_amount: i64,

    /// Amount taken off by the loyalty discount
    pub loyalty_discount_amount: i64,

    /// Payable amount
    pub total_incl_tax: i64,
}

impl SalePayload {
    /// Flatten a cart and its freshly computed totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a line's product is missing from the catalog or the
    /// totals cannot be calculated.
    pub fn from_cart(cart: &Cart<'_>, catalog: &Catalog<'_>) -> Result<Self, CheckoutError> {
        let totals = cart.totals()?;

        let lines = cart
            .iter()
            .zip(totals.lines())
            .map(|(item, line)| {
                let product = catalog
                    .get(item.product())
                    .ok_or(CheckoutError::UnknownProduct(item.product()))?;

                Ok(SaleLinePayload {
                    product_id: product.id.clone(),
                    quantity: item.quantity(),
                    base_unit_price: item.base_unit_price().to_minor_units(),
                    final_unit_price: line.final_unit_price.to_minor_units(),
                    discount_rate: discounts::percent_points(item.discount()),
                    tax_rate: discounts::percent_points(item.tax_rate()),
                    total_excl_tax: line.total_excl_tax.to_minor_units(),
                    tax: line.tax.to_minor_units(),
                    total_incl_tax: line.total_incl_tax.to_minor_units(),
                })
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;

        Ok(Self {
            currency: cart.currency().iso_alpha_code,
            payment_method: cart.payment_method(),
            customer_id: cart.customer().map(|customer| customer.id().to_string()),
            global_discount: totals.global_discount_rate(),
            loyalty_discount: totals.loyalty_discount_rate(),
            lines,
            total_excl_tax: totals.total_excl_tax().to_minor_units(),
            total_tax: totals.total_tax().to_minor_units(),
            subtotal_incl_tax: totals.subtotal_incl_tax().to_minor_units(),
            global_discount_amount: totals.global_discount_amount().to_minor_units(),
            loyalty_discount_amount: totals.loyalty_discount_amount().to_minor_units(),
            total_incl_tax: totals.total_incl_tax().to_minor_units(),
        })
    }
}

/// Submits carts through a [`SaleGateway`].
#[derive(Debug, Clone)]
pub struct CheckoutService<G> {
    gateway: G,
}

impl<G: SaleGateway> CheckoutService<G> {
    /// Create a checkout service over the given gateway.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Validate, price and submit the cart.
    ///
    /// On success the cart is cleared and the backend confirmation returned.
    /// On any failure the cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a local [`CheckoutError`] if validation fails, or
    /// [`CheckoutError::Gateway`] carrying the backend error as received.
    pub async fn submit(
        &self,
        cart: &mut Cart<'_>,
        catalog: &Catalog<'_>,
    ) -> Result<SaleConfirmation, CheckoutError> {
        if let Err(error) = validate(cart, catalog) {
            warn!(%error, "sale rejected before submission");

            return Err(error);
        }

        let sale = SalePayload::from_cart(cart, catalog)?;

        let confirmation = match self.gateway.submit_sale(&sale).await {
            Ok(confirmation) => confirmation,
            Err(error) => {
                warn!(%error, total = sale.total_incl_tax, "sale submission failed");

                return Err(error.into());
            }
        };

        info!(
            sale = %confirmation.id,
            lines = sale.lines.len(),
            total = sale.total_incl_tax,
            currency = sale.currency,
            payment_method = %sale.payment_method,
            "sale recorded"
        );

        cart.clear();

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        customers::Customer,
        discounts::DiscountError,
        gateway::MockSaleGateway,
        items::LineItem,
    };

    use super::*;

    fn rate(points: i64) -> Result<decimal_percentage::Percentage, DiscountError> {
        discounts::rate_from_points(Decimal::from(points))
    }

    fn brake_discs() -> TestResult<Product<'static>> {
        Ok(Product {
            id: "P-BD-280".to_string(),
            name: "Brake disc 280mm".to_string(),
            reference: "BD-280".to_string(),
            price: Money::from_minor(10_000, GBP),
            tax_rate: rate(19)?,
            stock: 3,
        })
    }

    /// Two brake discs, 10% off the line, 10% global discount.
    fn sale_cart(catalog: &Catalog<'static>, key: ProductKey) -> TestResult<Cart<'static>> {
        let product = catalog.get(key).ok_or("missing product")?;
        let item = LineItem::from_product(key, product, 2)?.with_discount(rate(10)?)?;

        let mut cart = Cart::with_items([item], GBP)?;
        cart.set_global_discount(rate(10)?)?;

        Ok(cart)
    }

    fn catalog() -> TestResult<(Catalog<'static>, ProductKey)> {
        let mut catalog = Catalog::with_key();
        let key = catalog.insert(brake_discs()?);

        Ok((catalog, key))
    }

    #[test]
    fn validate_rejects_empty_cart() -> TestResult {
        let (catalog, _) = catalog()?;

        let result = validate(&Cart::new(GBP), &catalog);

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));

        Ok(())
    }

    #[test]
    fn validate_rejects_unknown_product() -> TestResult {
        let (catalog, _) = catalog()?;
        let item = LineItem::new(ProductKey::default(), 1, Money::from_minor(100, GBP))?;
        let cart = Cart::with_items([item], GBP)?;

        let result = validate(&cart, &catalog);

        assert!(matches!(result, Err(CheckoutError::UnknownProduct(_))));

        Ok(())
    }

    #[test]
    fn validate_sums_quantities_across_lines() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;

        let product = catalog.get(key).ok_or("missing product")?;
        cart.add_item(LineItem::from_product(key, product, 2)?)?;

        let result = validate(&cart, &catalog);

        match result {
            Err(CheckoutError::InsufficientStock {
                product,
                requested,
                available,
            }) => {
                assert_eq!(product, "P-BD-280");
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => return Err(format!("expected insufficient stock, got {other:?}").into()),
        }

        Ok(())
    }

    #[test]
    fn validate_reports_unknown_product_before_stock() -> TestResult {
        let (catalog, key) = catalog()?;
        let product = catalog.get(key).ok_or("missing product")?;

        let mut cart = Cart::with_items([LineItem::from_product(key, product, 5)?], GBP)?;
        cart.add_item(LineItem::new(
            ProductKey::default(),
            1,
            Money::from_minor(100, GBP),
        )?)?;

        assert!(matches!(
            validate(&cart, &catalog),
            Err(CheckoutError::UnknownProduct(_))
        ));

        Ok(())
    }

    #[test]
    fn validate_reports_first_short_product_in_cart_order() -> TestResult {
        let mut catalog = Catalog::with_key();
        let discs = catalog.insert(brake_discs()?);
        let pads = catalog.insert(Product {
            id: "P-BP-112".to_string(),
            name: "Brake pad set".to_string(),
            reference: "BP-112".to_string(),
            price: Money::from_minor(4_590, GBP),
            tax_rate: rate(19)?,
            stock: 1,
        });

        let pads_product = catalog.get(pads).ok_or("missing pads")?;
        let discs_product = catalog.get(discs).ok_or("missing discs")?;

        let mut cart = Cart::with_items([LineItem::from_product(pads, pads_product, 1)?], GBP)?;
        cart.add_item(LineItem::from_product(discs, discs_product, 4)?)?;
        cart.add_item(LineItem::from_product(pads, pads_product, 1)?)?;

        assert!(matches!(
            validate(&cart, &catalog),
            Err(CheckoutError::InsufficientStock { ref product, requested: 2, available: 1 })
                if product == "P-BP-112"
        ));

        Ok(())
    }

    #[test]
    fn validate_requires_customer_for_credit() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;
        cart.set_payment_method(PaymentMethod::Credit);

        assert!(matches!(
            validate(&cart, &catalog),
            Err(CheckoutError::CustomerRequired(PaymentMethod::Credit))
        ));

        cart.select_customer(Some(Customer::new("C-1", "Garage Amrani")));

        assert!(validate(&cart, &catalog).is_ok());

        Ok(())
    }

    #[test]
    fn payload_flattens_totals_in_minor_units() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;
        cart.select_customer(Some(Customer::loyal("C-1", "Garage Amrani", rate(5)?)?));

        let sale = SalePayload::from_cart(&cart, &catalog)?;
        let line = sale.lines.first().ok_or("missing line")?;

        assert_eq!(sale.currency, "GBP");
        assert_eq!(sale.customer_id.as_deref(), Some("C-1"));
        assert_eq!(sale.global_discount, Decimal::from(10));
        assert_eq!(sale.loyalty_discount, Decimal::from(5));
        assert_eq!(sale.subtotal_incl_tax, 18_000);
        assert_eq!(sale.global_discount_amount, 1_800);
        assert_eq!(sale.loyalty_discount_amount, 810);
        assert_eq!(sale.total_incl_tax, 15_390);

        assert_eq!(line.product_id, "P-BD-280");
        assert_eq!(line.final_unit_price, 9_000);
        assert_eq!(line.tax, 2_874);
        assert_eq!(line.total_excl_tax, 15_126);

        Ok(())
    }

    #[test]
    fn payload_serializes_camel_case() -> TestResult {
        let (catalog, key) = catalog()?;
        let cart = sale_cart(&catalog, key)?;

        let json = serde_json::to_value(SalePayload::from_cart(&cart, &catalog)?)?;

        assert_eq!(json["paymentMethod"], "CASH");
        assert_eq!(json["totalInclTax"], 16_200);
        assert_eq!(json["lines"][0]["productId"], "P-BD-280");
        assert!(json["customerId"].is_null());

        Ok(())
    }

    #[tokio::test]
    async fn submit_clears_cart_on_success() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;

        let mut gateway = MockSaleGateway::new();
        gateway
            .expect_submit_sale()
            .withf(|sale| sale.total_incl_tax == 16_200)
            .times(1)
            .returning(|_| {
                Ok(SaleConfirmation {
                    id: "S-42".to_string(),
                })
            });

        let confirmation = CheckoutService::new(gateway)
            .submit(&mut cart, &catalog)
            .await?;

        assert_eq!(confirmation.id, "S-42");
        assert!(cart.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn submit_keeps_cart_when_backend_rejects() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;

        let mut gateway = MockSaleGateway::new();
        gateway.expect_submit_sale().times(1).returning(|_| {
            Err(GatewayError::Rejected {
                status: 409,
                message: "Stock insuffisant".to_string(),
            })
        });

        let result = CheckoutService::new(gateway)
            .submit(&mut cart, &catalog)
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::Gateway(GatewayError::Rejected { status: 409, ref message }))
                if message == "Stock insuffisant"
        ));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.totals()?.total_incl_tax(), Money::from_minor(16_200, GBP));

        Ok(())
    }

    #[tokio::test]
    async fn submit_never_calls_gateway_for_invalid_cart() -> TestResult {
        let (catalog, key) = catalog()?;
        let mut cart = sale_cart(&catalog, key)?;
        cart.set_payment_method(PaymentMethod::Credit);

        let mut gateway = MockSaleGateway::new();
        gateway.expect_submit_sale().never();

        let result = CheckoutService::new(gateway)
            .submit(&mut cart, &catalog)
            .await;

        assert!(matches!(result, Err(CheckoutError::CustomerRequired(_))));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.payment_method(), PaymentMethod::Credit);

        Ok(())
    }
}
