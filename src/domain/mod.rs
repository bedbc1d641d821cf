pub mod activity;
pub mod assignment;
pub mod checkout;
pub mod errors;
pub mod lifecycle;
pub mod order;
pub mod partner;
pub mod payment;
pub mod ports;
