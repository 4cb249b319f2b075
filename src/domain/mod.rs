pub mod cart;
pub mod checkout;
pub mod events;
pub mod value_objects;
