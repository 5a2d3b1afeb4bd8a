pub mod binance_models;
pub mod cost_table;
pub mod quote;
pub mod symbol;
pub mod topology;
pub mod triangular_path;
