pub mod normal_mode;
pub mod pipeline;
pub mod topology_mode;
