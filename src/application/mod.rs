mod book_service;
mod errors;
mod loan_service;
mod member_service;
pub mod queries;
mod reservation_service;
mod transaction;

pub use book_service::{acquire_book, dispose_book};
pub use errors::{EntityKind, ErrorKind, LibraryError, Result};
pub use loan_service::{renew_book, renew_loan, return_book, return_loan, start_loan};
pub use member_service::{register_member, withdraw_member};
pub use reservation_service::{cancel_reservation, place_reservation, use_reservation};
pub use transaction::{Outcome, ServiceDependencies, dispatch, execute};
