pub mod customer;
pub mod segment;
