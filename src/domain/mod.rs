pub mod book;
pub mod commands;
pub mod errors;
pub mod loan;
pub mod member;
pub mod reservation;
pub mod value_objects;

pub use book::Book;
pub use errors::*;
pub use loan::{Loan, LoanStatus};
pub use member::{Member, MemberRef};
pub use reservation::Reservation;
pub use value_objects::*;
