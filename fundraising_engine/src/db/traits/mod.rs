//! #  Primary store contracts
//!
//! The primary store is the authoritative home of campaigns and payment records. The search index only ever holds a
//! derived copy.
//!
//! * [`PrimaryStore`] defines everything the settlement and sync pipeline needs from a storage backend. The two
//!   operations the pipeline's correctness rests on are [`PrimaryStore::insert_payment_if_absent`] (a single atomic
//!   conditional insert keyed on the checkout id) and [`PrimaryStore::increment_amount_collected`] (an atomic add at
//!   the storage layer). Neither may be emulated with a read followed by a write, since several process instances can
//!   share one store.
mod data_objects;
mod primary_store;

pub use data_objects::{InsertPaymentResult, SettlementResult};
pub use primary_store::PrimaryStore;
