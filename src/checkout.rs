//! Checkout sessions for carts and quoted print requests.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::domain::aggregates::{CartBreakdown, CartEntry, PrintStatus};
use crate::domain::value_objects::{Address, Identity, Money};
use crate::ports::{Catalog, CheckoutSession, PaymentGateway, SessionLine, SessionRequest};
use crate::pricing;
use crate::reconciler::{PrintRequestPatch, PrintRequestReconciler};
use crate::{PrintShopError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct CartCheckout { pub session: CheckoutSession, pub breakdown: CartBreakdown }

pub struct CheckoutService {
    reconciler: Arc<PrintRequestReconciler>,
    catalog: Arc<dyn Catalog>,
    payments: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(reconciler: Arc<PrintRequestReconciler>, catalog: Arc<dyn Catalog>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { reconciler, catalog, payments }
    }

    pub fn currency(&self) -> &str { self.reconciler.currency() }

    /// The priced cart shown to the customer before paying.
    pub async fn breakdown(&self, entries: &[CartEntry], destination: &Address) -> Result<CartBreakdown> {
        pricing::price_cart(self.catalog.as_ref(), entries, destination, self.currency()).await
    }

    /// Prices the cart exactly as [`CheckoutService::breakdown`] does and opens
    /// a payment session for it.
    pub async fn checkout_cart(&self, entries: &[CartEntry], destination: &Address, customer_email: Option<String>) -> Result<CartCheckout> {
        if entries.is_empty() {
            return Err(PrintShopError::Validation("cart is empty".to_string()));
        }
        let breakdown = self.breakdown(entries, destination).await?;

        let mut lines = Vec::with_capacity(breakdown.items.len() * 2);
        for item in &breakdown.items {
            lines.push(SessionLine { name: item.name.clone(), unit_amount: minor(item.price, &item.currency), quantity: item.quantity });
            if item.delivery_fee > Decimal::ZERO {
                let kind = item.chosen_delivery_type.as_deref().unwrap_or("delivery");
                lines.push(SessionLine {
                    name: format!("Delivery ({kind}): {}", item.name),
                    unit_amount: minor(item.delivery_fee, &item.currency),
                    quantity: 1,
                });
            }
        }

        let request = SessionRequest {
            currency: breakdown.currency.clone(),
            lines,
            customer_email,
            metadata: serde_json::json!({ "kind": "cart", "items": breakdown.items.len() }),
        };
        let session = self.payments.create_session(request).await?;
        info!(session_id = %session.id, amount_total = session.amount_total, "cart checkout session created");
        Ok(CartCheckout { session, breakdown })
    }

    /// Opens a payment session for a quoted print request and moves it to
    /// `payment_pending`.
    pub async fn checkout_print_request(&self, request_id: &str, user_id: &str) -> Result<CheckoutSession> {
        let record = self.reconciler.get_or_lazy_create(request_id, user_id).await?;
        if !matches!(record.status(), PrintStatus::Quoted | PrintStatus::PaymentPending) {
            return Err(PrintShopError::Validation(format!("print request is {}, not quoted", record.status())));
        }

        let customer_email = Some(record.user_email().to_string()).filter(|e| e != Identity::UNKNOWN_EMAIL);
        let request = SessionRequest {
            currency: record.currency().to_string(),
            lines: vec![SessionLine {
                name: format!("Custom 3D print {}", record.request_id()),
                unit_amount: minor(record.total_amount(), record.currency()),
                quantity: 1,
            }],
            customer_email,
            metadata: serde_json::json!({ "kind": "print_request", "request_id": record.request_id() }),
        };
        let session = self.payments.create_session(request).await?;
        info!(request_id = %record.request_id(), session_id = %session.id, "print request checkout session created");

        if record.status() == PrintStatus::Quoted {
            let patch = PrintRequestPatch {
                status: Some(PrintStatus::PaymentPending),
                note: Some(format!("Checkout session {} created", session.id)),
                ..Default::default()
            };
            self.reconciler.apply_update(request_id, user_id, patch).await?;
        }
        Ok(session)
    }
}

fn minor(amount: Decimal, currency: &str) -> i64 { Money::new(amount, currency).minor_units() }

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::aggregates::{DeliveryOption, Discount, PackageDimensions, Product};
    use crate::domain::value_objects::Dimensions;
    use crate::ports::PaymentError;
    use crate::reconciler::QuoteRequest;
    use crate::store::{MemoryCatalog, MemoryPrintRequestStore};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct RecordingGateway { requests: RwLock<Vec<SessionRequest>>, fail: bool }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_session(&self, request: SessionRequest) -> std::result::Result<CheckoutSession, PaymentError> {
            if self.fail { return Err(PaymentError("card network down".into())); }
            let session = CheckoutSession {
                id: format!("cs_{}", self.requests.read().await.len() + 1),
                url: "https://pay.example.com/session".into(),
                amount_total: request.amount_total(),
                currency: request.currency.clone(),
            };
            self.requests.write().await.push(request);
            Ok(session)
        }
    }

    async fn service(gateway: Arc<RecordingGateway>) -> (CheckoutService, Arc<PrintRequestReconciler>) {
        let catalog = Arc::new(MemoryCatalog::new(Decimal::new(10, 0), "SGD"));
        catalog.insert(
            Product::create("P1", "Dragon", Money::sgd(Decimal::new(1250, 2)))
                .with_package(0.4, Dimensions::new(10.0, 10.0, 10.0))
                .with_delivery_type("singpost", Some(Decimal::new(1, 0))),
        ).await;
        catalog.insert(Product::create("P2", "Keychain", Money::sgd(Decimal::new(3, 0))).with_delivery_type("pickup", None)).await;
        let discount = Discount { discounted_price: Decimal::new(335, 3), active: true, starts_at: None, ends_at: None };
        catalog.insert(
            Product::create("P3", "Sticker", Money::sgd(Decimal::new(1, 0)))
                .with_discount(discount)
                .with_delivery_type("pickup", Some(Decimal::new(1005, 4))),
        ).await;
        let reconciler = Arc::new(PrintRequestReconciler::new(Arc::new(MemoryPrintRequestStore::new()), catalog.clone()));
        (CheckoutService::new(reconciler.clone(), catalog, gateway), reconciler)
    }

    fn entries() -> Vec<CartEntry> {
        vec![
            CartEntry { product_id: "P1".into(), quantity: 2, chosen_delivery_type: Some("singpost".into()) },
            CartEntry { product_id: "P2".into(), quantity: 3, chosen_delivery_type: Some("pickup".into()) },
        ]
    }

    #[tokio::test]
    async fn test_checkout_matches_breakdown() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, _) = service(gateway.clone()).await;
        let malaysia = Address { country: Some("Malaysia".into()), ..Default::default() };

        let shown = service.breakdown(&entries(), &malaysia).await.unwrap();
        let checkout = service.checkout_cart(&entries(), &malaysia, None).await.unwrap();

        assert_eq!(checkout.breakdown, shown);
        // 2 x 12.50 + (1.00 royalty + 5.70 zone_a 0.5 kg) + 3 x 3.00
        assert_eq!(shown.grand_total, Decimal::new(4070, 2));
        assert_eq!(checkout.session.amount_total, minor(shown.grand_total, "SGD"));
        let requests = gateway.requests.read().await;
        assert_eq!(requests[0].lines.len(), 3);
    }

    #[tokio::test]
    async fn test_sub_cent_discount_charges_breakdown_total() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, _) = service(gateway.clone()).await;
        let cart = [CartEntry { product_id: "P3".into(), quantity: 3, chosen_delivery_type: Some("pickup".into()) }];

        let checkout = service.checkout_cart(&cart, &Address::default(), None).await.unwrap();
        let item = &checkout.breakdown.items[0];
        assert_eq!(item.price, Decimal::new(34, 2));
        assert_eq!(item.delivery_fee, Decimal::new(10, 2));
        // 3 x 0.34 + 0.10
        assert_eq!(checkout.breakdown.grand_total, Decimal::new(112, 2));
        assert_eq!(checkout.session.amount_total, 112);
        assert_eq!(gateway.requests.read().await[0].amount_total(), minor(checkout.breakdown.grand_total, "SGD"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart() {
        let (service, _) = service(Arc::new(RecordingGateway::default())).await;
        assert!(matches!(service.checkout_cart(&[], &Address::default(), None).await, Err(PrintShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_payment_failure_surfaces() {
        let (service, _) = service(Arc::new(RecordingGateway { fail: true, ..Default::default() })).await;
        assert!(matches!(service.checkout_cart(&entries(), &Address::default(), None).await, Err(PrintShopError::Payment(_))));
    }

    #[tokio::test]
    async fn test_print_request_checkout() {
        let gateway = Arc::new(RecordingGateway::default());
        let (service, reconciler) = service(gateway.clone()).await;
        let record = reconciler.create("u1", None).await.unwrap();
        let id = record.request_id().to_string();

        assert!(matches!(service.checkout_print_request(&id, "u1").await, Err(PrintShopError::Validation(_))));

        let quote = QuoteRequest {
            amount: Decimal::new(30, 0),
            note: None,
            dimensions: PackageDimensions { length: 200.0, width: 150.0, height: 50.0, weight: 1.0 },
            delivery_types: vec![DeliveryOption { kind: "singpost".into(), ..Default::default() }],
            destination_country: Some("Singapore".into()),
        };
        let quoted = reconciler.quote(record.request_id(), quote).await.unwrap();
        // 10 base + 30 print + 3 domestic small packet
        assert_eq!(quoted.total_amount(), Decimal::new(43, 0));

        let session = service.checkout_print_request(&id, "u1").await.unwrap();
        assert_eq!(session.amount_total, 4300);
        let after = reconciler.get_or_lazy_create(&id, "u1").await.unwrap();
        assert_eq!(after.status(), PrintStatus::PaymentPending);

        // A second attempt reuses the pending state.
        service.checkout_print_request(&id, "u1").await.unwrap();
        assert_eq!(gateway.requests.read().await.len(), 2);
    }
}
