//! In-memory fakes for the store and provider traits.
//!
//! Shared by the unit tests across modules; none of this compiles into
//! the production crate.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use jabuticaba_core::{
    AddressId, CustomerId, Email, NotificationId, OrderId, OrderItemId, OrderStatus,
};
use rust_decimal::Decimal;
use std::sync::Mutex;

use crate::carrier::{
    CarrierApi, CarrierError, RateRequest, ShipmentCreated, ShipmentRequest,
};
use crate::db::{NotificationStore, OrderStore, RepositoryError, StatusChange, ZoneStore};
use crate::models::{
    Address, CustomerContact, DeliverySettings, DeliveryZone, FreightOffer, NewOrder,
    NewOrderItem, NotificationRecord, Order, OrderItem, ShipmentInfo, ShippingMethod,
};
use crate::notifications::{ChatError, ChatMetadata, ChatSender, EmailError, EmailSender};
use crate::payment::{CollectionHandle, CollectionRequest, PaymentError, PaymentProvider};

/// A ready-made persisted order for tests that do not go through checkout.
pub fn order_fixture(id: i64, shipping_method: ShippingMethod) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::new(id),
        customer_id: CustomerId::new(id),
        status: OrderStatus::Pending,
        subtotal: Decimal::new(25_000, 2),
        discount: Decimal::ZERO,
        shipping: Decimal::ZERO,
        total: Decimal::new(25_000, 2),
        shipping_address_id: AddressId::new(id),
        shipping_method,
        notes: None,
        carrier_shipment_id: None,
        carrier_protocol: None,
        tracking_code: None,
        created_at: now,
        updated_at: now,
    }
}

/// A shipping address in the given neighborhood.
pub fn address_fixture(id: i64, neighborhood: &str, postal_code: &str) -> Address {
    Address {
        id: AddressId::new(id),
        customer_id: CustomerId::new(id),
        recipient_name: "Maria Silva".to_owned(),
        street: "Rua das Flores".to_owned(),
        number: "123".to_owned(),
        complement: None,
        neighborhood: neighborhood.to_owned(),
        city: "São Paulo".to_owned(),
        state: "SP".parse().unwrap(),
        postal_code: postal_code.parse().unwrap(),
        phone: Some("11987654321".parse().unwrap()),
    }
}

/// An active delivery zone covering the given neighborhoods.
pub fn zone_fixture(id: i64, name: &str, neighborhoods: &[&str], price: &str) -> DeliveryZone {
    DeliveryZone {
        id: jabuticaba_core::ZoneId::new(id),
        name: name.to_owned(),
        neighborhoods: neighborhoods.iter().map(|&n| n.to_owned()).collect(),
        price: price.parse().unwrap(),
        estimated_time: "até 2 horas".to_owned(),
        is_active: true,
    }
}

// =============================================================================
// Carrier
// =============================================================================

#[derive(Default)]
struct FakeCarrierState {
    offers: Vec<FreightOffer>,
    rates_error: Option<String>,
    shipment_error: Option<String>,
}

/// Scriptable [`CarrierApi`] implementation.
///
/// Clones share state, so a test can keep a handle for assertions after
/// moving the fake into the component under test.
#[derive(Clone, Default)]
pub struct FakeCarrier {
    state: Arc<Mutex<FakeCarrierState>>,
    shipment_calls: Arc<AtomicUsize>,
    rate_calls: Arc<AtomicUsize>,
}

impl FakeCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an offer returned by `calculate_rates`, in insertion order.
    #[must_use]
    pub fn with_offer(
        self,
        service_id: i64,
        carrier_name: &str,
        service_name: &str,
        price: &str,
        delivery_days: u32,
    ) -> Self {
        self.state.lock().unwrap().offers.push(FreightOffer {
            service_id,
            carrier_name: carrier_name.to_owned(),
            service_name: service_name.to_owned(),
            price: price.parse().unwrap(),
            delivery_days,
        });
        self
    }

    /// Make `calculate_rates` fail with the given provider message.
    #[must_use]
    pub fn failing_rates(self, message: &str) -> Self {
        self.state.lock().unwrap().rates_error = Some(message.to_owned());
        self
    }

    /// Make `create_shipment` fail with the given provider message.
    #[must_use]
    pub fn failing_shipments(self, message: &str) -> Self {
        self.state.lock().unwrap().shipment_error = Some(message.to_owned());
        self
    }

    /// How many shipments were created.
    pub fn shipment_calls(&self) -> usize {
        self.shipment_calls.load(Ordering::SeqCst)
    }

    /// How many rate quotes were requested.
    pub fn rate_calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CarrierApi for FakeCarrier {
    async fn calculate_rates(
        &self,
        _request: &RateRequest,
    ) -> Result<Vec<FreightOffer>, CarrierError> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.rates_error {
            return Err(CarrierError::Api {
                status: 503,
                message: message.clone(),
            });
        }
        Ok(state.offers.clone())
    }

    async fn create_shipment(
        &self,
        _request: &ShipmentRequest,
    ) -> Result<ShipmentCreated, CarrierError> {
        {
            let state = self.state.lock().unwrap();
            if let Some(message) = &state.shipment_error {
                return Err(CarrierError::Api {
                    status: 503,
                    message: message.clone(),
                });
            }
        }
        let n = self.shipment_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ShipmentCreated {
            shipment_id: format!("SHIP-{n}"),
            protocol: format!("PROT-{n}"),
        })
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Scriptable [`PaymentProvider`] implementation recording every request.
#[derive(Clone, Default)]
pub struct FakePayment {
    requests: Arc<Mutex<Vec<CollectionRequest>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl FakePayment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make handle creation fail with the given provider message.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        let fake = Self::default();
        *fake.error.lock().unwrap() = Some(message.to_owned());
        fake
    }

    /// Clear a previously scripted failure.
    pub fn recover(&self) {
        *self.error.lock().unwrap() = None;
    }

    /// Every collection request seen so far.
    pub fn requests(&self) -> Vec<CollectionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for FakePayment {
    async fn create_collection_handle(
        &self,
        request: &CollectionRequest,
    ) -> Result<CollectionHandle, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = self.error.lock().unwrap().as_ref() {
            return Err(PaymentError::Api {
                status: 502,
                message: message.clone(),
            });
        }
        Ok(CollectionHandle {
            checkout_url: format!("https://pay.example/checkout/{}", request.order_id),
        })
    }
}

// =============================================================================
// Zone store
// =============================================================================

/// Fixed-content [`ZoneStore`] implementation.
#[derive(Clone)]
pub struct MemoryZoneStore {
    zones: Vec<DeliveryZone>,
    settings: DeliverySettings,
}

impl MemoryZoneStore {
    pub fn new(zones: Vec<DeliveryZone>, settings: DeliverySettings) -> Self {
        Self { zones, settings }
    }
}

#[async_trait]
impl ZoneStore for MemoryZoneStore {
    async fn active_zones(&self) -> Result<Vec<DeliveryZone>, RepositoryError> {
        Ok(self.zones.iter().filter(|z| z.is_active).cloned().collect())
    }

    async fn settings(&self) -> Result<DeliverySettings, RepositoryError> {
        Ok(self.settings.clone())
    }
}

// =============================================================================
// Order store
// =============================================================================

#[derive(Default)]
struct MemoryOrderState {
    orders: HashMap<i64, Order>,
    items: HashMap<i64, Vec<OrderItem>>,
    addresses: HashMap<i64, Address>,
    contacts: HashMap<i64, CustomerContact>,
    locks: HashSet<i64>,
    next_order_id: i64,
    next_item_id: i64,
    status_update_failure: Option<String>,
}

/// In-memory [`OrderStore`] implementation.
///
/// Clones share state. Status updates write their transition records into
/// the attached [`MemoryNotificationStore`], mirroring the production
/// store's single-transaction behavior.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    state: Arc<Mutex<MemoryOrderState>>,
    notifications: MemoryNotificationStore,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the given notification store, so a dispatcher draining it
    /// sees the records that status updates create.
    #[must_use]
    pub fn with_notifications(notifications: MemoryNotificationStore) -> Self {
        Self {
            state: Arc::default(),
            notifications,
        }
    }

    /// Make the next `update_status` call fail without changing anything.
    pub fn fail_next_update_status(&self, message: &str) {
        self.state.lock().unwrap().status_update_failure = Some(message.to_owned());
    }

    /// Seed a persisted order directly.
    pub fn insert_order(&self, order: Order) {
        let mut state = self.state.lock().unwrap();
        state.next_order_id = state.next_order_id.max(order.id.as_i64());
        state.orders.insert(order.id.as_i64(), order);
    }

    /// Seed an address.
    pub fn insert_address(&self, address: Address) {
        self.state
            .lock()
            .unwrap()
            .addresses
            .insert(address.id.as_i64(), address);
    }

    /// Seed a customer's contact data.
    pub fn set_contact(&self, customer_id: CustomerId, contact: CustomerContact) {
        self.state
            .lock()
            .unwrap()
            .contacts
            .insert(customer_id.as_i64(), contact);
    }

    /// Snapshot of every persisted order.
    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().unwrap().orders.values().cloned().collect()
    }

    /// Snapshot of one order's items.
    pub fn items(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.state
            .lock()
            .unwrap()
            .items
            .get(&order_id.as_i64())
            .cloned()
            .unwrap_or_default()
    }

    /// Simulate another process holding an order's provisioning lock.
    pub fn hold_lock(&self, order_id: OrderId) {
        self.state.lock().unwrap().locks.insert(order_id.as_i64());
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.next_order_id += 1;
        let id = state.next_order_id;
        let now = Utc::now();

        let persisted = Order {
            id: OrderId::new(id),
            customer_id: order.customer_id,
            status: OrderStatus::Pending,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping: order.shipping,
            total: order.total,
            shipping_address_id: order.shipping_address_id,
            shipping_method: order.shipping_method,
            notes: order.notes,
            carrier_shipment_id: None,
            carrier_protocol: None,
            tracking_code: None,
            created_at: now,
            updated_at: now,
        };

        let persisted_items = items
            .iter()
            .map(|item| {
                state.next_item_id += 1;
                OrderItem {
                    id: OrderItemId::new(state.next_item_id),
                    order_id: OrderId::new(id),
                    product_name: item.product_name.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    size: item.size.clone(),
                    color: item.color.clone(),
                }
            })
            .collect();

        state.orders.insert(id, persisted.clone());
        state.items.insert(id, persisted_items);
        Ok(persisted)
    }

    async fn order(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.state
            .lock()
            .unwrap()
            .orders
            .get(&id.as_i64())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn shipping_address(&self, id: OrderId) -> Result<Address, RepositoryError> {
        let state = self.state.lock().unwrap();
        let order = state.orders.get(&id.as_i64()).ok_or(RepositoryError::NotFound)?;
        state
            .addresses
            .get(&order.shipping_address_id.as_i64())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn customer_contact(&self, id: OrderId) -> Result<CustomerContact, RepositoryError> {
        let state = self.state.lock().unwrap();
        let order = state.orders.get(&id.as_i64()).ok_or(RepositoryError::NotFound)?;
        state
            .contacts
            .get(&order.customer_id.as_i64())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<StatusChange, RepositoryError> {
        let old = {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.status_update_failure.take() {
                return Err(RepositoryError::Conflict(message));
            }
            let order = state
                .orders
                .get_mut(&id.as_i64())
                .ok_or(RepositoryError::NotFound)?;
            let old = order.status;
            if old != new_status {
                order.status = new_status;
                order.updated_at = Utc::now();
            }
            old
        };

        let record = if old == new_status {
            None
        } else {
            self.notifications.insert_transition(id, old, new_status)
        };
        Ok(StatusChange {
            old_status: old,
            record,
        })
    }

    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentInfo,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&id.as_i64())
            .ok_or(RepositoryError::NotFound)?;
        if order.carrier_shipment_id.is_some() {
            return Ok(false);
        }
        order.carrier_shipment_id = Some(shipment.shipment_id.clone());
        order.carrier_protocol = Some(shipment.protocol.clone());
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn try_lock_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().unwrap().locks.insert(id.as_i64()))
    }

    async fn unlock_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.state.lock().unwrap().locks.remove(&id.as_i64());
        Ok(())
    }
}

// =============================================================================
// Notification store
// =============================================================================

#[derive(Default)]
struct MemoryNotificationState {
    records: Vec<NotificationRecord>,
    next_id: i64,
}

/// In-memory [`NotificationStore`] implementation.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryNotificationStore {
    state: Arc<Mutex<MemoryNotificationState>>,
    dispatch_locked: Arc<AtomicBool>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record.
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.state.lock().unwrap().records.clone()
    }

    /// Simulate another dispatcher holding the dispatch lock.
    pub fn hold_dispatch_lock(&self) {
        self.dispatch_locked.store(true, Ordering::SeqCst);
    }

    /// Append a transition record, absorbing duplicates the way the
    /// unique constraint does. Called by [`MemoryOrderStore`] from its
    /// status updates.
    pub fn insert_transition(
        &self,
        order_id: OrderId,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Option<NotificationRecord> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state.records.iter().any(|r| {
            r.order_id == order_id && r.old_status == old_status && r.new_status == new_status
        });
        if duplicate {
            return None;
        }

        state.next_id += 1;
        let record = NotificationRecord {
            id: NotificationId::new(state.next_id),
            order_id,
            old_status,
            new_status,
            notified_at: None,
            error: None,
            created_at: Utc::now(),
        };
        state.records.push(record.clone());
        Some(record)
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<NotificationRecord>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|r| r.notified_at.is_none())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_notified(
        &self,
        id: NotificationId,
        partial_error: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.id == id && r.notified_at.is_none())
        else {
            return Ok(false);
        };
        record.notified_at = Some(Utc::now());
        record.error = partial_error.map(str::to_owned);
        Ok(true)
    }

    async fn record_failure(
        &self,
        id: NotificationId,
        error: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.id == id && r.notified_at.is_none())
        {
            record.error = Some(error.to_owned());
        }
        Ok(())
    }

    async fn try_acquire_dispatch_lock(&self) -> Result<bool, RepositoryError> {
        Ok(self
            .dispatch_locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    async fn release_dispatch_lock(&self) -> Result<(), RepositoryError> {
        self.dispatch_locked.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Notification channels
// =============================================================================

/// One email captured by [`RecordingEmailSender`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: Email,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Recording [`EmailSender`] implementation. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail with the given message.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        let sender = Self::default();
        *sender.failure.lock().unwrap() = Some(message.to_owned());
        sender
    }

    /// Every email sent so far.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(
        &self,
        to: &Email,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            return Err(EmailError::InvalidAddress(message.clone()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.clone(),
            subject: subject.to_owned(),
            text: text_body.to_owned(),
            html: html_body.to_owned(),
        });
        Ok(())
    }
}

/// One chat message captured by [`RecordingChatSender`].
#[derive(Debug, Clone)]
pub struct SentChatMessage {
    pub phone: String,
    pub message: String,
    pub order_id: OrderId,
}

/// Recording [`ChatSender`] implementation. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingChatSender {
    posts: Arc<Mutex<Vec<SentChatMessage>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingChatSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every post fail with the given message.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        let sender = Self::default();
        *sender.failure.lock().unwrap() = Some(message.to_owned());
        sender
    }

    /// Every message posted so far.
    pub fn posts(&self) -> Vec<SentChatMessage> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingChatSender {
    async fn post(
        &self,
        phone_e164: &str,
        message: &str,
        metadata: &ChatMetadata,
    ) -> Result<(), ChatError> {
        if let Some(failure) = self.failure.lock().unwrap().as_ref() {
            return Err(ChatError::Api {
                status: 503,
                message: failure.clone(),
            });
        }
        self.posts.lock().unwrap().push(SentChatMessage {
            phone: phone_e164.to_owned(),
            message: message.to_owned(),
            order_id: metadata.order_id,
        });
        Ok(())
    }
}
