//! Core types for Jabuticaba.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod phone;
pub mod postal_code;
pub mod state;
pub mod status;
pub mod tax_id;

pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use postal_code::{PostalCode, PostalCodeError};
pub use state::{StateCode, StateCodeError};
pub use status::{OrderStatus, ParseOrderStatusError};
pub use tax_id::{TaxId, TaxIdError};
