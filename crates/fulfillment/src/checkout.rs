//! Checkout orchestration.
//!
//! Drives the checkout session state machine
//! (`AddressEntry → DeliverySelection → Review → Submitting → Done | Failed`),
//! combines zone matching and freight quotes into the delivery options
//! offered to the customer, computes the order total, persists the order
//! and requests a payment-collection handle.
//!
//! The session itself is request-scoped and never persisted; the customer
//! can go back or abandon it at any point before submission.

use jabuticaba_core::{CustomerId, OrderId, TaxId, ZoneId};
use rust_decimal::Decimal;
use tracing::instrument;

use crate::carrier::CarrierApi;
use crate::db::{OrderStore, RepositoryError, ZoneStore};
use crate::freight::{FreightAggregator, FreightError};
use crate::models::{
    Address, CarrierSelection, DeliverySettings, DeliveryZone, FreightQuote, NewOrder,
    NewOrderItem, Parcel, ShippingMethod,
};
use crate::payment::{
    CollectionRequest, PaymentLineItem, PaymentProvider, RedirectUrls,
};
use crate::zones::match_zones;

/// Receipt line title for the synthetic shipping item.
const SHIPPING_LINE_TITLE: &str = "Frete";

/// Errors that can occur during checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// A session cannot start with an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Operation not valid in the session's current state.
    #[error("invalid checkout state: expected {expected}, session is in {actual:?}")]
    InvalidState {
        /// State the operation requires.
        expected: &'static str,
        /// State the session is actually in.
        actual: SessionState,
    },

    /// Last-mile selected for a zone that was not offered.
    #[error("zone {zone_id} is not offered for this address")]
    LastMileNotOffered {
        /// The rejected zone.
        zone_id: ZoneId,
    },

    /// Carrier selected but no freight quote is loaded.
    #[error("no freight quote available for this address")]
    NoFreightQuote,

    /// Carrier offer not present in the current quote.
    #[error("freight offer {service_id} is not part of the current quote")]
    UnknownOffer {
        /// The rejected carrier service id.
        service_id: i64,
    },

    /// Review requested without a delivery selection.
    #[error("no delivery option selected")]
    NoDeliverySelected,

    /// Freight quoting failed; retryable.
    #[error(transparent)]
    Freight(#[from] FreightError),

    /// Persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The order was persisted but the payment provider failed. Retryable:
    /// the pending order stays in place for an operator, and resubmitting
    /// creates a fresh pending order.
    #[error("payment unavailable for order {order_id}: {provider_message}")]
    PaymentUnavailable {
        /// The already-persisted pending order.
        order_id: OrderId,
        /// Provider error text, verbatim.
        provider_message: String,
    },
}

/// Checkout session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a shipping address.
    AddressEntry,
    /// Address known; customer is picking a delivery option.
    DeliverySelection,
    /// Delivery picked; totals are final and shown for confirmation.
    Review,
    /// Order persistence / payment handle in flight.
    Submitting,
    /// Order persisted and payment handle obtained.
    Done,
    /// Submission failed; the customer may resubmit.
    Failed,
}

/// One cart line: the purchasable snapshot plus its physical parcel data.
#[derive(Debug, Clone)]
pub struct CartLine {
    /// Line item snapshot persisted onto the order.
    pub item: NewOrderItem,
    /// Parcel data used for freight quoting and shipment creation.
    pub parcel: Parcel,
}

/// The customer's delivery choice.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeliveryChoice {
    LastMile { zone_id: ZoneId },
    Carrier { service_id: i64 },
}

/// The delivery options resolvable for an address.
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Matching active zones; empty means the last-mile option is hidden.
    /// The first zone is the pre-selected default.
    pub last_mile_zones: Vec<DeliveryZone>,
    /// Settings in effect when the options were resolved.
    pub settings: DeliverySettings,
}

/// Totals and method computed at review time.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Coupon/promotion discount.
    pub discount: Decimal,
    /// Shipping to charge, after any free-delivery threshold.
    pub shipping: Decimal,
    /// `subtotal - discount + shipping`.
    pub total: Decimal,
    /// The delivery method to persist.
    pub shipping_method: ShippingMethod,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The persisted order.
    pub order_id: OrderId,
    /// Hosted payment URL to send the customer to.
    pub checkout_url: String,
}

/// A request-scoped checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    customer_id: CustomerId,
    cart: Vec<CartLine>,
    discount: Decimal,
    notes: Option<String>,
    state: SessionState,
    address: Option<Address>,
    matched_zones: Vec<DeliveryZone>,
    settings: DeliverySettings,
    quote: Option<FreightQuote>,
    tax_id: Option<TaxId>,
    choice: Option<DeliveryChoice>,
}

impl CheckoutSession {
    /// Start a session for a cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart.
    pub fn new(
        customer_id: CustomerId,
        cart: Vec<CartLine>,
        discount: Decimal,
        notes: Option<String>,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(Self {
            customer_id,
            cart,
            discount,
            notes,
            state: SessionState::AddressEntry,
            address: None,
            matched_zones: Vec::new(),
            settings: DeliverySettings::default(),
            quote: None,
            tax_id: None,
            choice: None,
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.cart.iter().map(|line| line.item.line_total()).sum()
    }

    /// Parcel data for every cart line.
    #[must_use]
    pub fn parcels(&self) -> Vec<Parcel> {
        self.cart.iter().map(|line| line.parcel.clone()).collect()
    }

    /// The current freight quote, if one is loaded and fresh.
    #[must_use]
    pub const fn quote(&self) -> Option<&FreightQuote> {
        self.quote.as_ref()
    }

    /// Apply a freight quote, dropping it when it was computed for a
    /// postal code the session no longer ships to (a stale in-flight
    /// result from a rapid postal-code edit). Returns whether the quote
    /// was applied.
    pub fn apply_freight_quote(&mut self, quote: FreightQuote) -> bool {
        let Some(address) = &self.address else {
            return false;
        };
        if quote.postal_code != address.postal_code {
            return false;
        }

        // A previously selected offer may be gone from the new quote.
        if let Some(DeliveryChoice::Carrier { service_id }) = self.choice
            && quote.offer(service_id).is_none()
        {
            self.choice = None;
        }

        self.quote = Some(quote);
        true
    }

    /// Select a matched last-mile zone.
    ///
    /// # Errors
    ///
    /// Returns an error outside `DeliverySelection`, or when the zone was
    /// not among the matched options.
    pub fn select_last_mile(&mut self, zone_id: ZoneId) -> Result<(), CheckoutError> {
        self.require_state(SessionState::DeliverySelection, "DeliverySelection")?;

        if !self.matched_zones.iter().any(|z| z.id == zone_id) {
            return Err(CheckoutError::LastMileNotOffered { zone_id });
        }

        self.choice = Some(DeliveryChoice::LastMile { zone_id });
        Ok(())
    }

    /// Select a carrier offer from the current quote.
    ///
    /// The carrier rejects shipments without a valid recipient CPF, so the
    /// tax ID is required here, at selection time, as an already-validated
    /// [`TaxId`].
    ///
    /// # Errors
    ///
    /// Returns an error outside `DeliverySelection`, when no quote is
    /// loaded, or when the offer is not part of the current quote.
    pub fn select_carrier(&mut self, service_id: i64, tax_id: TaxId) -> Result<(), CheckoutError> {
        self.require_state(SessionState::DeliverySelection, "DeliverySelection")?;

        let quote = self.quote.as_ref().ok_or(CheckoutError::NoFreightQuote)?;
        if quote.offer(service_id).is_none() {
            return Err(CheckoutError::UnknownOffer { service_id });
        }

        self.tax_id = Some(tax_id);
        self.choice = Some(DeliveryChoice::Carrier { service_id });
        Ok(())
    }

    /// Freeze the delivery selection and compute final totals.
    ///
    /// Shipping is the selected zone's price or the selected offer's
    /// price; the free-delivery threshold then zeroes it for last-mile
    /// only. Carrier shipping is never discounted.
    ///
    /// # Errors
    ///
    /// Returns an error outside `DeliverySelection`, or when no delivery
    /// option has been selected.
    pub fn proceed_to_review(&mut self) -> Result<OrderDraft, CheckoutError> {
        self.require_state(SessionState::DeliverySelection, "DeliverySelection")?;

        let draft = self.build_draft()?;
        self.state = SessionState::Review;
        Ok(draft)
    }

    /// Abandon the session. Allowed at any point before submission.
    pub fn cancel(&mut self) {
        if !matches!(self.state, SessionState::Submitting | SessionState::Done) {
            self.state = SessionState::Failed;
            self.choice = None;
        }
    }

    fn build_draft(&self) -> Result<OrderDraft, CheckoutError> {
        let subtotal = self.subtotal();
        let choice = self.choice.as_ref().ok_or(CheckoutError::NoDeliverySelected)?;

        let (shipping, shipping_method) = match choice {
            DeliveryChoice::LastMile { zone_id } => {
                let zone = self
                    .matched_zones
                    .iter()
                    .find(|z| z.id == *zone_id)
                    .ok_or(CheckoutError::LastMileNotOffered { zone_id: *zone_id })?;

                let free = self
                    .settings
                    .free_delivery_threshold
                    .is_some_and(|threshold| subtotal >= threshold);
                let shipping = if free { Decimal::ZERO } else { zone.price };

                (shipping, ShippingMethod::LastMile { zone_id: *zone_id })
            }
            DeliveryChoice::Carrier { service_id } => {
                let quote = self.quote.as_ref().ok_or(CheckoutError::NoFreightQuote)?;
                let offer = quote
                    .offer(*service_id)
                    .ok_or(CheckoutError::UnknownOffer {
                        service_id: *service_id,
                    })?;
                let tax_id = self
                    .tax_id
                    .clone()
                    .ok_or(CheckoutError::NoDeliverySelected)?;

                let selection = CarrierSelection {
                    carrier_name: offer.carrier_name.clone(),
                    service_name: offer.service_name.clone(),
                    price: offer.price,
                    parcels: self.parcels(),
                    recipient_tax_id: tax_id,
                };

                (offer.price, ShippingMethod::Carrier(selection))
            }
        };

        Ok(OrderDraft {
            subtotal,
            discount: self.discount,
            shipping,
            total: subtotal - self.discount + shipping,
            shipping_method,
        })
    }

    fn require_state(
        &self,
        state: SessionState,
        expected: &'static str,
    ) -> Result<(), CheckoutError> {
        if self.state == state {
            Ok(())
        } else {
            Err(CheckoutError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

/// Orchestrates a checkout session against the stores and providers.
pub struct CheckoutOrchestrator<Z, O, C, P> {
    zones: Z,
    orders: O,
    freight: FreightAggregator<C>,
    payment: P,
    redirect_urls: RedirectUrls,
}

impl<Z, O, C, P> CheckoutOrchestrator<Z, O, C, P>
where
    Z: ZoneStore,
    O: OrderStore,
    C: CarrierApi,
    P: PaymentProvider,
{
    /// Create an orchestrator.
    pub const fn new(
        zones: Z,
        orders: O,
        freight: FreightAggregator<C>,
        payment: P,
        redirect_urls: RedirectUrls,
    ) -> Self {
        Self {
            zones,
            orders,
            freight,
            payment,
            redirect_urls,
        }
    }

    /// Record the shipping address and resolve the delivery options for it.
    ///
    /// Re-entering an address is allowed any time before submission and
    /// resets the delivery selection and any loaded freight quote.
    ///
    /// # Errors
    ///
    /// Returns an error when called during or after submission, or when
    /// zone configuration cannot be read.
    #[instrument(skip(self, session, address), fields(postal_code = %address.postal_code))]
    pub async fn enter_address(
        &self,
        session: &mut CheckoutSession,
        address: Address,
    ) -> Result<DeliveryOptions, CheckoutError> {
        if matches!(session.state, SessionState::Submitting | SessionState::Done) {
            return Err(CheckoutError::InvalidState {
                expected: "AddressEntry, DeliverySelection or Review",
                actual: session.state,
            });
        }

        let settings = self.zones.settings().await?;

        let last_mile_zones = if settings.last_mile_enabled
            && session.subtotal() >= settings.minimum_order
        {
            let zones = self.zones.active_zones().await?;
            match_zones(&address.neighborhood, &address.city, &zones)
                .into_iter()
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        session.address = Some(address);
        session.matched_zones.clone_from(&last_mile_zones);
        session.settings = settings.clone();
        session.quote = None;
        session.choice = None;
        session.state = SessionState::DeliverySelection;

        Ok(DeliveryOptions {
            last_mile_zones,
            settings,
        })
    }

    /// Quote freight for the session's current address and apply it.
    ///
    /// Returns whether the quote was applied; a quote that comes back for
    /// a postal code the session has since moved away from is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when no address is entered or the carrier is
    /// unavailable.
    #[instrument(skip(self, session))]
    pub async fn refresh_freight(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<bool, CheckoutError> {
        let Some(address) = &session.address else {
            return Err(CheckoutError::InvalidState {
                expected: "DeliverySelection",
                actual: session.state,
            });
        };

        let destination = address.postal_code.clone();
        let quote = self.freight.quote(destination, &session.parcels()).await?;
        Ok(session.apply_freight_quote(quote))
    }

    /// Persist the order and request a payment-collection handle.
    ///
    /// Order and items are written as one atomic unit. If the payment
    /// provider then fails, the pending order is left in place (an
    /// operator may still process or cancel it) and the error carries the
    /// order id; resubmitting creates a fresh pending order.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Review`/`Failed`, on persistence failure,
    /// or as [`CheckoutError::PaymentUnavailable`] after a payment failure.
    #[instrument(skip(self, session), fields(customer_id = %session.customer_id))]
    pub async fn submit(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<SubmitOutcome, CheckoutError> {
        if !matches!(session.state, SessionState::Review | SessionState::Failed) {
            return Err(CheckoutError::InvalidState {
                expected: "Review",
                actual: session.state,
            });
        }

        let draft = session.build_draft()?;
        let Some(address) = &session.address else {
            return Err(CheckoutError::InvalidState {
                expected: "Review",
                actual: session.state,
            });
        };

        session.state = SessionState::Submitting;

        let new_order = NewOrder {
            customer_id: session.customer_id,
            subtotal: draft.subtotal,
            discount: draft.discount,
            shipping: draft.shipping,
            total: draft.total,
            shipping_address_id: address.id,
            shipping_method: draft.shipping_method.clone(),
            notes: session.notes.clone(),
        };
        let items: Vec<NewOrderItem> =
            session.cart.iter().map(|line| line.item.clone()).collect();

        let order = match self.orders.create_order(new_order, &items).await {
            Ok(order) => order,
            Err(e) => {
                session.state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let mut line_items: Vec<PaymentLineItem> = items
            .iter()
            .map(|item| PaymentLineItem {
                title: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        // The receipt must reflect the real charge breakdown.
        if draft.shipping > Decimal::ZERO {
            line_items.push(PaymentLineItem {
                title: SHIPPING_LINE_TITLE.to_owned(),
                quantity: 1,
                unit_price: draft.shipping,
            });
        }

        let request = CollectionRequest {
            order_id: order.id,
            amount: order.total,
            line_items,
            redirect_urls: self.redirect_urls.clone(),
        };

        match self.payment.create_collection_handle(&request).await {
            Ok(handle) => {
                session.state = SessionState::Done;
                Ok(SubmitOutcome {
                    order_id: order.id,
                    checkout_url: handle.checkout_url,
                })
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "payment handle creation failed; order left pending");
                session.state = SessionState::Failed;
                Err(CheckoutError::PaymentUnavailable {
                    order_id: order.id,
                    provider_message: e.provider_message(),
                })
            }
        }
    }
}
