pub mod inbound_movement;
pub mod inventory_item;
pub mod outbound_movement;
pub mod stock_take;
pub mod stock_take_item;
