//! Fixtures
//!
//! YAML sample data for the `pos` binary and the integration tests. A set
//! named `workshop` lives in `products/workshop.yml`,
//! `customers/workshop.yml` and `carts/workshop.yml` under the base path.

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{Cart, CartError},
    customers::Customer,
    discounts::{self, DiscountError},
    fixtures::{carts::CartFixture, customers::CustomersFixture, products::ProductsFixture},
    items::input::ValidationError,
    products::{Catalog, Product, ProductKey, find_by_id},
};

pub mod carts;
pub mod customers;
pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer not found
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// No cart loaded
    #[error("No cart loaded")]
    NoCart,

    /// A cart line failed validation
    #[error("Invalid cart line {index}: {source}")]
    Line {
        /// Position of the line in the fixture
        index: usize,

        /// Validation failure
        source: ValidationError,
    },

    /// Discount out of range
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Cart creation error
    #[error("Failed to create cart: {0}")]
    Cart(#[from] CartError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Products with generated keys
    catalog: Catalog<'a>,

    /// Customers by backend id
    customers: FxHashMap<String, Customer>,

    /// Cart description, validated when a cart is built
    cart: Option<CartFixture>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: Catalog::with_key(),
            customers: FxHashMap::default(),
            cart: None,
            currency: None,
        }
    }

    /// Load a complete set (products, customers, cart) from the default base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the set's files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_set(name)?;

        Ok(fixture)
    }

    /// Load products, customers and cart of the named set.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the set's files cannot be loaded.
    pub fn load_set(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.load_products(name)?
            .load_customers(name)?
            .load_cart(name)
    }

    /// Load products from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: ProductsFixture = self.read_yaml("products", name)?;

        let mut entries: Vec<_> = fixture.products.into_iter().collect();

        // Stable keys regardless of map iteration order
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));

        for (id, product_fixture) in entries {
            let product = product_fixture.into_product(id)?;
            let currency = product.price.currency();

            if let Some(existing_currency) = self.currency {
                if existing_currency != currency {
                    return Err(FixtureError::CurrencyMismatch(
                        existing_currency.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                self.currency = Some(currency);
            }

            self.catalog.insert(product);
        }

        debug!(set = name, products = self.catalog.len(), "loaded products");

        Ok(self)
    }

    /// Load customers from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_customers(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CustomersFixture = self.read_yaml("customers", name)?;

        for (id, customer_fixture) in fixture.customers {
            let customer = customer_fixture.into_customer(id.clone())?;

            self.customers.insert(id, customer);
        }

        debug!(set = name, customers = self.customers.len(), "loaded customers");

        Ok(self)
    }

    /// Load a cart description from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.cart = Some(self.read_yaml("carts", name)?);

        Ok(self)
    }

    fn read_yaml<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        name: &str,
    ) -> Result<T, FixtureError> {
        let file_path = self.base_path.join(kind).join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        Ok(serde_norway::from_str(&contents)?)
    }

    /// Build a cart from the loaded cart description.
    ///
    /// Every line is validated against the catalog as checkout input would be.
    ///
    /// # Errors
    ///
    /// Returns an error if no cart was loaded, a line is invalid, or the
    /// referenced customer is unknown.
    pub fn cart(&self) -> Result<Cart<'a>, FixtureError> {
        let fixture = self.cart.as_ref().ok_or(FixtureError::NoCart)?;
        let mut cart = Cart::new(self.currency()?);

        for (index, line) in fixture.lines.iter().enumerate() {
            let item = line
                .validate(&self.catalog)
                .map_err(|source| FixtureError::Line { index, source })?;

            cart.add_item(item)?;
        }

        let global_discount = match fixture.global_discount.as_deref() {
            Some(discount) => products::parse_percentage(discount)?,
            None => discounts::zero(),
        };

        cart.set_global_discount(global_discount)?;

        if let Some(id) = &fixture.customer {
            cart.select_customer(Some(self.customer(id)?.clone()));
        }

        cart.set_payment_method(fixture.payment_method);

        Ok(cart)
    }

    /// Get a product by backend id
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, id: &str) -> Result<&Product<'a>, FixtureError> {
        find_by_id(&self.catalog, id)
            .map(|(_, product)| product)
            .ok_or_else(|| FixtureError::ProductNotFound(id.to_string()))
    }

    /// Get a product's catalog key by backend id
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product_key(&self, id: &str) -> Result<ProductKey, FixtureError> {
        find_by_id(&self.catalog, id)
            .map(|(key, _)| key)
            .ok_or_else(|| FixtureError::ProductNotFound(id.to_string()))
    }

    /// Get a customer by backend id
    ///
    /// # Errors
    ///
    /// Returns an error if the customer is not found.
    pub fn customer(&self, id: &str) -> Result<&Customer, FixtureError> {
        self.customers
            .get(id)
            .ok_or_else(|| FixtureError::CustomerNotFound(id.to_string()))
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog<'a> {
        &self.catalog
    }

    /// Get the currency of the loaded products
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }
}
