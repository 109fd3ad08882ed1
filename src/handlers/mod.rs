pub mod auth;
pub mod bookings;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod health;
pub mod pages;
