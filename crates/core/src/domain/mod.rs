pub mod action;
pub mod order;
pub mod product;
pub mod user;
