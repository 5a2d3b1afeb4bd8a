pub mod cost_matrix;
pub mod selector;
pub mod sink;
pub mod topology;
