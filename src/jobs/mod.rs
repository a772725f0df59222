pub mod order_updates;
pub mod promotions;
pub mod recommendations;
