//! Auto-parts POS prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    checkout::{CheckoutError, CheckoutService, SaleLinePayload, SalePayload, validate},
    customers::Customer,
    discounts::DiscountError,
    gateway::{GatewayError, HttpGatewayConfig, HttpSaleGateway, SaleConfirmation, SaleGateway},
    items::{
        ItemError, LineItem,
        input::{LineItemInput, NumericInput, ValidationError},
    },
    payments::PaymentMethod,
    pricing::{CartTotals, LineTotals, PricingError, calculate_totals},
    products::{Catalog, Product, ProductKey},
    receipt::{Receipt, ReceiptError},
};
